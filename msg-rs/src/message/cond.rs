//! `(if condition|then|else)`.

use tracing::debug;

use super::{Context, Engine};

/// Resolve an `(if ...)` token.  Never fails: anything that cannot be
/// evaluated yields an empty string.
pub(super) fn resolve(engine: &Engine, matched: &str, ctx: &Context) -> String {
    let body = matched.strip_suffix(')').unwrap_or(matched).replacen("(if ", "", 1);
    let param = ctx.param.as_deref().unwrap_or_default();
    let body = body.replace("$!param", param).replace("$param", param);

    let mut parts = body.split('|');
    let check = parts.next().unwrap_or_default();
    let (Some(then), otherwise) = (parts.next(), parts.next()) else {
        return String::new();
    };

    // a bare comparison such as `>2` would otherwise read as a range
    let truthy = if check.starts_with(['>', '<', '=']) {
        false
    } else {
        match engine.services.expressions.evaluate_boolean(check) {
            Ok(v) => v,
            Err(e) => {
                debug!(condition = check, error = %e, "if condition failed");
                return String::new();
            }
        }
    };
    if truthy {
        then.to_owned()
    } else {
        otherwise.unwrap_or_default().to_owned()
    }
}
