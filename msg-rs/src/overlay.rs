//! Text overlays: a widget text with custom variables shown inline.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::grammar;
use crate::message::{Context, Engine};

static VARIABLE: OnceLock<Regex> = OnceLock::new();

/// Render an overlay text.
///
/// Set variables are replaced by their value.  Unset ones render as
/// `<strong>$_name</strong>` in the final text so the streamer can spot
/// them.  The result then goes through the message pipeline with an empty
/// context.
pub async fn render(engine: &Engine, text: &str) -> Result<String> {
    let vars = &engine.services().variables;
    let names: Vec<String> = grammar::fixed(&VARIABLE, r"\$_[a-zA-Z0-9_]+")?
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect();

    let mut text = text.to_owned();
    let mut unset = Vec::new();
    for name in names {
        if !text.contains(&name) {
            continue;
        }
        if vars.is_set(&name).await? {
            let value = vars.get(&name, None, None).await?;
            text = text.replace(&name, &value);
        } else {
            // parked outside the pipeline, which would read it as a variable
            let marker = format!("\u{1}{}\u{1}", unset.len());
            text = text.replace(&name, &marker);
            unset.push((marker, format!("<strong>{name}</strong>")));
        }
    }

    let mut rendered = engine.parse(&text, &Context::default()).await;
    for (marker, placeholder) in unset {
        rendered = rendered.replace(&marker, &placeholder);
    }
    Ok(rendered)
}
