//! `(stream|<channel>|game|title|viewers)`: another channel's live stream.

use tracing::debug;

use super::Engine;
use crate::error::{Error, Result};
use crate::services::Credentials;

const HELIX: &str = "https://api.twitch.tv/helix";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamField {
    Game,
    Title,
    Viewers,
}

impl StreamField {
    fn suffix(self) -> &'static str {
        match self {
            StreamField::Game => "|game)",
            StreamField::Title => "|title)",
            StreamField::Viewers => "|viewers)",
        }
    }

    fn fallback(self) -> &'static str {
        match self {
            StreamField::Viewers => "0",
            _ => "n/a",
        }
    }
}

/// Never fails: lookups that go wrong render the field's fallback.
pub(super) async fn resolve(engine: &Engine, matched: &str, field: StreamField) -> String {
    let channel = matched
        .strip_prefix("(stream|")
        .and_then(|s| s.strip_suffix(field.suffix()))
        .unwrap_or_default();
    match lookup(engine, channel, field).await {
        Ok(value) => value,
        Err(e) => {
            debug!(channel, ?field, error = %e, "stream lookup failed");
            field.fallback().to_owned()
        }
    }
}

async fn lookup(engine: &Engine, channel: &str, field: StreamField) -> Result<String> {
    let creds = engine
        .services
        .broadcast
        .credentials()
        .await?
        .filter(|c| !c.access_token.is_empty())
        .ok_or_else(|| Error::Service("no access token".into()))?;

    let user = first(helix(engine, &creds, &format!("{HELIX}/users?login={}", urlencoding::encode(channel))).await?)?;
    let user_id = text(&user, "id")?;
    let stream = first(helix(engine, &creds, &format!("{HELIX}/streams?user_id={user_id}")).await?)?;

    match field {
        StreamField::Title => text(&stream, "title"),
        StreamField::Viewers => Ok(stream
            .get("viewer_count")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
            .to_string()),
        StreamField::Game => {
            let game_id = text(&stream, "game_id")?;
            let game = first(helix(engine, &creds, &format!("{HELIX}/games?id={game_id}")).await?)?;
            text(&game, "name")
        }
    }
}

async fn helix(engine: &Engine, creds: &Credentials, url: &str) -> Result<serde_json::Value> {
    let headers = [
        ("Authorization".to_owned(), format!("Bearer {}", creds.access_token)),
        ("Client-ID".to_owned(), creds.client_id.clone()),
    ];
    let response = engine.services.http.get(url, &headers).await?;
    if response.status != 200 {
        return Err(Error::Http(format!("{url} returned {}", response.status)));
    }
    Ok(serde_json::from_str(&response.body)?)
}

/// `data[0]` of a Helix response.
fn first(mut body: serde_json::Value) -> Result<serde_json::Value> {
    match body.get_mut("data").and_then(|d| d.get_mut(0)) {
        Some(item) => Ok(item.take()),
        None => Err(Error::Service("empty helix response".into())),
    }
}

fn text(item: &serde_json::Value, key: &str) -> Result<String> {
    item.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::Service(format!("missing '{key}'")))
}
