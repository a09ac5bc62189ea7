//! Custom variables: `$_name`, `$!_name` and `$!!_name`.
//!
//! With a command argument the variable is set to it; without one its
//! current value is read.

use super::{Context, Engine};
use crate::error::Result;
use crate::services::ResponseType;

/// How loudly a variable token reacts to being set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarMode {
    /// `$_name`: follow the variable's response type.
    Normal,
    /// `$!_name`: set without any chat response.
    Quiet,
    /// `$!!_name`: set silently and substitute nothing.
    Silent,
}

pub(super) async fn resolve(engine: &Engine, mode: VarMode, matched: &str, ctx: &Context) -> Result<Option<String>> {
    let bare = ["$!!_", "$!_", "$_"]
        .iter()
        .find_map(|prefix| matched.strip_prefix(prefix))
        .unwrap_or(matched);
    let name = format!("$_{bare}");
    let vars = &engine.services.variables;

    let Some(value) = ctx.arg() else {
        return Ok(match mode {
            VarMode::Silent => Some(String::new()),
            _ => Some(vars.get(&name, Some(&ctx.sender), ctx.param.as_deref()).await?),
        });
    };

    let state = vars.set(&name, value, &ctx.sender).await?;
    Ok(Some(match mode {
        VarMode::Silent => String::new(),
        VarMode::Quiet => state.current_value,
        VarMode::Normal => match state.response_type {
            ResponseType::Default => {
                if state.is_ok && !state.is_eval {
                    let text = engine
                        .services
                        .translator
                        .translate("filters.setVariable")
                        .replace("$value", &state.set_value)
                        .replace("$variable", &name);
                    engine.services.chat.send(&text, &ctx.sender, ctx.quiet).await?;
                }
                state.current_value
            }
            ResponseType::Custom => {
                let text = state.response_text.replacen("$value", &state.set_value, 1);
                engine.services.chat.send(&text, &ctx.sender, ctx.quiet).await?;
                String::new()
            }
            ResponseType::Command => state.current_value,
        },
    }))
}
