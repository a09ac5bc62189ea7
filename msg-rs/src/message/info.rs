//! `(price)`, top tips, `(game)` and `(status)`.

use std::cmp::Ordering;

use super::{Context, Engine};
use crate::error::Result;
use crate::services::Event;

/// `(price)`: the current command's price and the points label.
pub(super) async fn price(engine: &Engine, ctx: &Context) -> Result<Option<String>> {
    let mut price = 0;
    if engine.settings.price_enabled {
        if let Some(cmd) = &ctx.cmd {
            let prices = engine.services.registry.prices().await?;
            price = prices
                .iter()
                .find(|p| p.enabled && &p.command == cmd)
                .map_or(0, |p| p.price);
        }
    }
    let label = engine.services.points.name_for(price).await?;
    Ok(Some(format!("{price} {label}")))
}

/// `$toptip.<overall|stream>.<username|amount|message|currency>`, also in
/// parenthesised form.
pub(super) async fn top_tip(engine: &Engine, matched: &str) -> Result<Option<String>> {
    let body = matched
        .trim_start_matches(['$', '('])
        .trim_end_matches(')')
        .trim_start_matches("toptip.");
    let Some((scope, field)) = body.split_once('.') else {
        return Ok(Some(String::new()));
    };
    if !matches!(scope, "overall" | "stream") || !matches!(field, "username" | "amount" | "message" | "currency") {
        return Ok(Some(String::new()));
    }

    let main = &engine.settings.main_currency;
    let mut ranked: Vec<(f64, Event)> = Vec::new();
    for tip in engine.services.events.all("tip").await? {
        let amount = tip.value_f64("amount").unwrap_or(0.0);
        let currency = tip.value_str("currency").unwrap_or_else(|| main.clone());
        let converted = engine.services.currency.convert(amount, &currency, main).await?;
        ranked.push((converted, tip));
    }
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    if scope == "stream" {
        let stats = engine.services.broadcast.snapshot().await?;
        match stats.online_since.filter(|_| stats.online) {
            Some(since) => ranked.retain(|(_, tip)| tip.timestamp >= since),
            None => return Ok(Some(String::new())),
        }
    }

    let Some((_, top)) = ranked.first() else {
        return Ok(Some(String::new()));
    };
    Ok(Some(match field {
        "amount" => format!("{:.2}", top.value_f64("amount").unwrap_or(0.0)),
        "username" => top.value_str("username").unwrap_or_else(|| top.username.clone()),
        other => top.value_str(other).unwrap_or_default(),
    }))
}

pub(super) async fn game(engine: &Engine) -> Result<Option<String>> {
    let stats = engine.services.broadcast.snapshot().await?;
    Ok(Some(stats.game.filter(|g| !g.is_empty()).unwrap_or_else(|| "n/a".to_owned())))
}

pub(super) async fn status(engine: &Engine) -> Result<Option<String>> {
    let stats = engine.services.broadcast.snapshot().await?;
    Ok(Some(stats.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "n/a".to_owned())))
}
