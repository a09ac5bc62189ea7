//! `(eval <script>)`: run a script in the sandbox.
//!
//! The script sees:
//!
//! | Name | Value |
//! |------|-------|
//! | `users` | every known user, loaded only when the script mentions `users` or `random` |
//! | `is` | the sender's membership flags |
//! | `random` | `{ online: { viewer, follower, subscriber }, viewer, follower, subscriber }` |
//! | `sender` | the sender as a mention |
//! | `param` | the command argument, or `null` |
//! | `urlXXXXX` | one binding per `url("...")`, holding the fetched body |

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use super::random::{eligible, pick};
use super::{Context, Engine};
use crate::error::Result;
use crate::grammar;
use crate::script::{Scope, Value};
use crate::services::{User, UserFilter};

static URL_CALL: OnceLock<Regex> = OnceLock::new();
static RANDOM_HELPERS: OnceLock<Regex> = OnceLock::new();

pub(super) async fn resolve(engine: &Engine, matched: &str, ctx: &Context) -> Result<Option<String>> {
    let mut script = matched.replacen("(eval ", "", 1);
    script.pop();

    let uses_users = script.contains("users");
    let uses_random = grammar::fixed(&RANDOM_HELPERS, r"Math\.random|_\.random")?
        .replace_all(&script, "")
        .contains("random");
    let uses_online = script.contains("online");

    let mut scope = Scope::new();

    let calls: Vec<(String, String)> = grammar::fixed(&URL_CALL, r#"url\(['"](.*?)['"]\)"#)?
        .captures_iter(&script)
        .map(|c| (c[0].to_owned(), c[1].to_owned()))
        .collect();
    for (call, url) in calls {
        let id = url_id();
        let response = engine.services.http.get(&url, &[]).await?;
        let value = match response.json() {
            Some(json) => Value::from_json(json),
            None => Value::Str(response.body),
        };
        scope.insert(id.clone(), value);
        script = script.replacen(&call, &id, 1);
    }

    let users = if uses_users || uses_random {
        engine.services.users.all().await?
    } else {
        Vec::new()
    };
    let sender = match engine.services.users.by_name(&ctx.sender.username).await? {
        Some(user) => user,
        None => {
            engine
                .services
                .users
                .create(&ctx.sender.user_id, &ctx.sender.username)
                .await?
        }
    };

    let online = if uses_online {
        engine
            .services
            .users
            .query(UserFilter {
                online: Some(true),
                ..UserFilter::default()
            })
            .await?
    } else {
        Vec::new()
    };

    scope.insert("users", Value::List(users.iter().map(User::to_value).collect()));
    scope.insert("is", sender.flags());
    scope.insert("random", random_helpers(engine, &users, &online));
    scope.insert("sender", engine.mention(&ctx.sender.username));
    scope.insert("param", ctx.param.clone());

    let value = engine.services.expressions.evaluate_sandboxed(&script, scope)?;
    Ok(Some(value.to_string()))
}

/// `url` followed by five random hex digits.
fn url_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..0x10_0000);
    format!("url{n:05x}")
}

fn random_helpers(engine: &Engine, users: &[User], online: &[User]) -> Value {
    let sample = |pool: Vec<User>| pick(&eligible(engine, &pool));
    let online_where = |f: fn(&User) -> bool| online.iter().filter(|u| f(u)).cloned().collect::<Vec<_>>();
    let users_where = |f: fn(&User) -> bool| users.iter().filter(|u| f(u)).cloned().collect::<Vec<_>>();
    Value::from_json(serde_json::json!({
        "online": {
            "viewer": sample(online.to_vec()),
            "follower": sample(online_where(|u| u.is_follower)),
            "subscriber": sample(online_where(|u| u.is_subscriber)),
        },
        "viewer": pick(&users.iter().map(|u| u.username.clone()).collect::<Vec<_>>()),
        "follower": pick(&users_where(|u| u.is_follower).into_iter().map(|u| u.username).collect::<Vec<_>>()),
        "subscriber": pick(&users_where(|u| u.is_subscriber).into_iter().map(|u| u.username).collect::<Vec<_>>()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_ids_have_five_hex_digits() {
        for _ in 0..50 {
            let id = url_id();
            assert_eq!(id.len(), 8);
            assert!(id.starts_with("url"));
            assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
