//! `$querystring` and `(url|text)`.

use super::Context;

/// Characters URI encoding leaves alone on top of the unreserved set.
const URI_RESERVED: &str = ";,/?:@&=+$#!*'()";

/// Characters query-string escaping leaves alone on top of the unreserved set.
const QUERY_KEPT: &str = "!*'()";

pub(super) fn query_string(ctx: &Context) -> String {
    ctx.arg().map(|p| encode_keeping(p, QUERY_KEPT)).unwrap_or_default()
}

pub(super) fn url(matched: &str) -> String {
    let inner = matched
        .strip_prefix("(url|")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or_default();
    encode_uri(inner)
}

/// Percent-encode `s` as a whole URI: reserved characters survive.
pub fn encode_uri(s: &str) -> String {
    encode_keeping(s, URI_RESERVED)
}

fn encode_keeping(s: &str, kept: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for c in s.chars() {
        if kept.contains(c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}
