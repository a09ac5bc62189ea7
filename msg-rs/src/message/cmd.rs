//! `$count`, `$count('!cmd')`, `(!cmd)` and `(!!cmd)`.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use super::{Context, Engine};
use crate::error::Result;
use crate::grammar;
use crate::services::DispatchOptions;

static COUNT_OF: OnceLock<Regex> = OnceLock::new();

pub(super) async fn count_of(engine: &Engine, matched: &str) -> Result<Option<String>> {
    let re = grammar::fixed(&COUNT_OF, r"\$count\('(!\S*)'\)")?;
    Ok(Some(match re.captures(matched) {
        Some(caps) => engine.services.usage.count(&caps[1]).await?.to_string(),
        None => "0".to_owned(),
    }))
}

pub(super) async fn count(engine: &Engine, ctx: &Context) -> Result<Option<String>> {
    Ok(Some(match ctx.cmd.as_deref().filter(|c| !c.is_empty()) {
        Some(cmd) => engine.services.usage.count(cmd).await?.to_string(),
        None => "0".to_owned(),
    }))
}

/// Run the embedded command through the dispatcher, skipping cooldowns and
/// permissions.  The token renders as nothing whatever the dispatch outcome.
pub(super) async fn dispatch(engine: &Engine, matched: &str, ctx: &Context, quiet: bool) -> Result<Option<String>> {
    let text = if quiet { matched.replacen('!', "", 1) } else { matched.to_owned() };
    let text = text
        .replace(['(', ')'], "")
        .replace("$sender", &engine.mention(&ctx.sender.username))
        .replace("$param", ctx.param.as_deref().unwrap_or_default());
    if let Err(e) = engine
        .services
        .dispatcher
        .dispatch(&ctx.sender, &text, DispatchOptions { skip: true, quiet })
        .await
    {
        warn!(command = %text, error = %e, "inline command failed");
    }
    Ok(Some(String::new()))
}
