//! `(math.<expression>)`.

use std::sync::OnceLock;

use regex::Regex;

use super::Engine;
use crate::error::Result;
use crate::grammar;
use crate::script::value::format_number;

static VARIABLE: OnceLock<Regex> = OnceLock::new();

/// Evaluate the expression after substituting custom variables; values that
/// are not numbers count as 0.
pub(super) async fn resolve(engine: &Engine, matched: &str) -> Result<Option<String>> {
    let mut expr = matched.replacen("(math.", "", 1);
    if expr.ends_with(')') {
        expr.pop();
    }

    let names: Vec<String> = grammar::fixed(&VARIABLE, r"\$_\w+")?
        .find_iter(&expr)
        .map(|m| m.as_str().to_owned())
        .collect();
    for name in names {
        let value = engine.services.variables.get(&name, None, None).await?;
        let number = match value.trim() {
            v if v.parse::<f64>().map_or(false, f64::is_finite) => v.to_owned(),
            _ => "0".to_owned(),
        };
        expr = expr.replacen(&name, &number, 1);
    }

    let result = engine.services.arithmetic.evaluate(&expr)?;
    Ok(Some(format_number(result)))
}
