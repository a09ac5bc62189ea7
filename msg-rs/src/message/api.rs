//! `(api|url)` with `(api.path.to[0].value)` accessors or `(api._response)`.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use super::Message;
use crate::error::Result;
use crate::grammar;

static API_CALL: OnceLock<Regex> = OnceLock::new();
static ACCESSOR: OnceLock<Regex> = OnceLock::new();
static INDEXED: OnceLock<Regex> = OnceLock::new();

impl Message<'_> {
    /// Fetch the first `(api|url)` of the message and fill in its accessors.
    pub(super) async fn run_api(&mut self) {
        if self.is_blank() {
            return;
        }
        if let Err(e) = self.api().await {
            warn!(error = %e, "api token failed");
            self.text = self.engine.services.translator.translate("core.api.error");
        }
    }

    async fn api(&mut self) -> Result<()> {
        let Some((call, url)) = grammar::fixed(&API_CALL, r"(?i)\(api\|(http\S+?)\)")?
            .captures(&self.text)
            .map(|c| (c[0].to_owned(), c[1].replace("&amp;", "&")))
        else {
            return Ok(());
        };
        self.splice(&call, "");

        let engine = self.engine;
        let services = &engine.services;
        let response = services.http.get(&url, &[]).await?;
        if response.status != 200 {
            self.text = services.translator.translate("core.api.error");
            return Ok(());
        }

        let accessors: Vec<(String, String)> = grammar::fixed(&ACCESSOR, r"(?i)\(api\.(\S*?)\)")?
            .captures_iter(&self.text)
            .filter(|c| !c[1].starts_with("_response"))
            .map(|c| (c[0].to_owned(), c[1].to_owned()))
            .collect();

        if accessors.is_empty() {
            let body = match response.json() {
                Some(json @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => json.to_string(),
                _ => unquote(&response.body).to_owned(),
            };
            self.text = self.text.replacen("(api._response)", &body, 1);
            return Ok(());
        }

        let json = response.json().unwrap_or_default();
        let indexed = grammar::fixed(&INDEXED, r"^(\S+)\[(\d+)\]$")?;
        for (tag, path) in accessors {
            let value = walk(&json, &path, indexed)
                .and_then(render)
                .unwrap_or_else(|| services.translator.translate("core.api.not-available"));
            self.text = self.text.replacen(&tag, &value, 1);
        }
        Ok(())
    }
}

/// Follow a dotted path; a segment may index one array as `name[i]`.
fn walk<'a>(json: &'a serde_json::Value, path: &str, indexed: &Regex) -> Option<&'a serde_json::Value> {
    let mut node = json;
    for segment in path.split('.') {
        node = match indexed.captures(segment) {
            Some(c) => node.get(&c[1])?.get(c[2].parse::<usize>().ok()?)?,
            None => node.get(segment)?,
        };
    }
    Some(node)
}

fn render(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Strip one pair of surrounding double quotes.
fn unquote(body: &str) -> &str {
    body.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(body)
}
