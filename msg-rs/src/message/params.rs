//! `$touser`.  `$param` and `$!param` resolve directly from the context.

use super::{Context, Engine};

/// The argument as a mention, or the sender when no one is named.
pub(super) fn to_user(engine: &Engine, ctx: &Context) -> String {
    let target = ctx.param.as_deref().unwrap_or_default().replacen('@', "", 1);
    if target.is_empty() {
        engine.mention(&ctx.sender.username)
    } else {
        engine.mention(&target)
    }
}
