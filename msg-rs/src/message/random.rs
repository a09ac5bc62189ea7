//! `(random.*)`: random viewers, numbers and coin flips.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{Context, Engine};
use crate::error::Result;
use crate::services::{User, UserFilter};

/// Which viewers a random pick is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Viewer,
    Follower,
    Subscriber,
}

impl Pool {
    pub(super) fn filter(self, online: bool) -> UserFilter {
        UserFilter {
            online: online.then_some(true),
            follower: (self == Pool::Follower).then_some(true),
            subscriber: (self == Pool::Subscriber).then_some(true),
        }
    }
}

/// Random eligible username, or `unknown` when nobody qualifies.
pub(super) async fn user(engine: &Engine, online: bool, pool: Pool) -> Result<Option<String>> {
    let users = engine.services.users.query(pool.filter(online)).await?;
    let names = eligible(engine, &users);
    Ok(Some(pick(&names).unwrap_or_else(|| "unknown".to_owned())))
}

/// Usernames that may be picked: never the bot, the broadcaster or ignored
/// accounts.
pub(super) fn eligible(engine: &Engine, users: &[User]) -> Vec<String> {
    users
        .iter()
        .filter(|u| !engine.settings.is_excluded(&u.username))
        .map(|u| u.username.clone())
        .collect()
}

pub(super) fn pick(names: &[String]) -> Option<String> {
    names.choose(&mut rand::thread_rng()).cloned()
}

/// `(random.number-A-to-B)`.  Bounds that are not integers are taken, in
/// order, from the words of the command argument.
pub(super) fn number(matched: &str, ctx: &Context) -> String {
    let body = matched
        .trim_start_matches("(random.number-")
        .trim_end_matches(')');
    let mut words = ctx.param.as_deref().unwrap_or_default().split(' ');
    let mut bounds = [0i64; 2];
    for (slot, raw) in bounds.iter_mut().zip(body.splitn(2, "-to-")) {
        if let Some(n) = leading_int(raw) {
            *slot = n;
            continue;
        }
        match words.next() {
            Some(word) if ctx.param.is_some() => *slot = leading_int(word).unwrap_or(0),
            _ => return "0".to_owned(),
        }
    }
    let (lo, hi) = (bounds[0].min(bounds[1]), bounds[0].max(bounds[1]));
    rand::thread_rng().gen_range(lo..=hi).to_string()
}

/// `(random.true-or-false)`.
pub(super) fn true_or_false() -> String {
    rand::thread_rng().gen_bool(0.5).to_string()
}

/// Integer prefix of `s`, the way loose number parsing reads `"12abc"`.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}
