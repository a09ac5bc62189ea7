//! World description file parser.
//!
//! A line-oriented directive format that fills an in-memory [`World`] and the
//! engine's [`VarStore`]:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | engine setting |
//! | `/set stats.<field>=<value>` | stream statistics |
//! | `/set $_<name>=<value>` | custom variable |
//! | `/set rate.<CODE>=<value>` | currency rate |
//! | `/set points.singular=…`, `/set points.plural=…` | points label |
//! | `/set access_token=…`, `/set client_id=…` | platform credentials |
//! | `/set translate.<key>=<text>` | translation override |
//! | `/adduser [-ofs] <name> <id>` | viewer (online, follower, subscriber) |
//! | `/addevent [-t<rfc3339>] <kind> <username> [json]` | event log entry |
//! | `/addalias [-h] <alias>` | alias (`-h` hidden) |
//! | `/addcommand [-h] [-P<perm>]… <command>` | custom command |
//! | `/addcooldown <name> <ms>` | cooldown |
//! | `/addprice <command> <price>` | command price |
//! | `/addrank <rank> <hours>` | watch-time rank |
//! | `/addvariable [-r<mode>] [-m<text>] [-e] <$_name> [value]` | custom variable with response mode |
//! | `/addusage <command> <count>` | command usage counter |
//! | `/addroute <url> <status> [body]` | canned HTTP response |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::memory::{Variable, World};
use crate::services::{
    AliasEntry, CommandEntry, CooldownEntry, Event, PriceEntry, RankEntry, ResponseType, Song,
    StatsSnapshot, User,
};
use crate::var::VarStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Parsed configuration: engine settings and the world they describe.
#[derive(Debug, Default)]
pub struct Config {
    pub vars: VarStore,
    pub world: World,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Unknown directives are silently skipped.  Returns the config and a
    /// list of any parse errors on recognised lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            // blank lines and comments (`;` or `;;` prefix)
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            // directives all begin with `/`
            let Some(rest) = line.strip_prefix('/') else { continue };

            // split off the directive name
            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let tokens = split_args(args_str.trim());

            let result = match cmd {
                "set" => parse_set(&tokens, &mut config),
                "adduser" => parse_adduser(&tokens, &mut config.world),
                "addevent" => parse_addevent(args_str.trim(), &mut config.world),
                "addalias" => parse_addalias(&tokens, &mut config.world),
                "addcommand" => parse_addcommand(&tokens, &mut config.world),
                "addcooldown" => parse_addcooldown(&tokens, &mut config.world),
                "addprice" => parse_addprice(&tokens, &mut config.world),
                "addrank" => parse_addrank(&tokens, &mut config.world),
                "addvariable" => parse_addvariable(&tokens, &mut config.world),
                "addusage" => parse_addusage(&tokens, &mut config.world),
                "addroute" => parse_addroute(args_str.trim(), &mut config.world),
                _ => Ok(()), // silently skip unknown directives
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if !in_quotes => {
                in_quotes = true;
                quoted = true;
            }
            '"' if in_quotes => in_quotes = false,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                    quoted = false;
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

/// Flags and positional arguments of one directive.
#[derive(Debug, Default)]
struct Opts {
    switches: Vec<char>,
    values: Vec<(char, String)>,
    /// Positional (non-flag) arguments.
    positional: Vec<String>,
}

impl Opts {
    fn has(&self, flag: char) -> bool {
        self.switches.contains(&flag)
    }

    fn value(&self, flag: char) -> Option<&str> {
        self.values.iter().find(|(f, _)| *f == flag).map(|(_, v)| v.as_str())
    }

    fn all_values(&self, flag: char) -> impl Iterator<Item = &str> {
        self.values.iter().filter(move |(f, _)| *f == flag).map(|(_, v)| v.as_str())
    }
}

/// Parse leading flags.  Switches may be combined (`-ofs`); flags listed in
/// `value_flags` take a value attached (`-Pmods`) or separated (`-P mods`).
/// Flag parsing stops at the first positional argument so that values such
/// as negative numbers are never mistaken for flags.
fn parse_opts(tokens: &[String], value_flags: &str) -> Opts {
    let mut opts = Opts::default();

    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        if !(tok.starts_with('-') && tok.len() > 1) {
            break;
        }
        let mut chars = tok[1..].chars();
        while let Some(ch) = chars.next() {
            if value_flags.contains(ch) {
                // value is the rest of this token, or the next token
                let inline = chars.as_str().to_owned();
                let value = if !inline.is_empty() {
                    inline
                } else {
                    i += 1;
                    match tokens.get(i) {
                        Some(v) => v.clone(),
                        None => break,
                    }
                };
                opts.values.push((ch, value));
                break; // rest of token consumed by value
            }
            opts.switches.push(ch);
        }
        i += 1;
    }
    opts.positional = tokens[i.min(tokens.len())..].to_vec();
    opts
}

fn parse_num<T: std::str::FromStr>(directive: &str, what: &str, s: &str) -> Result<T, String> {
    s.parse()
        .map_err(|_| format!("{directive}: invalid {what} '{s}'"))
}

fn exactly<'a>(directive: &str, usage: &str, pos: &'a [String], n: usize) -> Result<&'a [String], String> {
    if pos.len() == n {
        Ok(pos)
    } else {
        Err(format!("{directive}: usage: {directive} {usage}"))
    }
}

// ── /set ─────────────────────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value>` and route it by name.
fn parse_set(tokens: &[String], config: &mut Config) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, first)) = tokens[0].split_once('=') {
        let mut value = first.to_owned();
        for extra in &tokens[1..] {
            value.push(' ');
            value.push_str(extra);
        }
        (name.to_owned(), value)
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    if name.is_empty() {
        return Err("/set: variable name cannot be empty".into());
    }

    let world = &mut config.world;
    if let Some(field) = name.strip_prefix("stats.") {
        set_stat(world.stats_mut(), field, &value)
    } else if name.starts_with("$_") {
        world.set_variable(
            &name,
            Variable {
                value,
                ..Variable::default()
            },
        );
        Ok(())
    } else if let Some(code) = name.strip_prefix("rate.") {
        world.set_rate(code, parse_num("/set", "rate", &value)?);
        Ok(())
    } else if let Some(key) = name.strip_prefix("translate.") {
        world.set_translation(key, &value);
        Ok(())
    } else {
        match name.as_str() {
            "points.singular" | "points.plural" => {
                let singular = config.vars.get("points.singular").unwrap_or("point").to_owned();
                let plural = config.vars.get("points.plural").unwrap_or("points").to_owned();
                match name.as_str() {
                    "points.singular" => world.set_points_names(&value, &plural),
                    _ => world.set_points_names(&singular, &value),
                }
            }
            "access_token" => world.credentials_mut().access_token = value.clone(),
            "client_id" => world.credentials_mut().client_id = value.clone(),
            _ => {}
        }
        config.vars.set(name, value);
        Ok(())
    }
}

fn set_stat(stats: &mut StatsSnapshot, field: &str, value: &str) -> Result<(), String> {
    let count = |v: &str| parse_num::<u64>("/set", "count", v);
    match field {
        "game" => stats.game = Some(value.to_owned()),
        "title" => stats.title = Some(value.to_owned()),
        "viewers" => stats.viewers = count(value)?,
        "views" => stats.views = count(value)?,
        "followers" => stats.followers = count(value)?,
        "hosts" => stats.hosts = count(value)?,
        "subscribers" => stats.subscribers = count(value)?,
        "bits" => stats.bits = count(value)?,
        "online" => {
            stats.online = matches!(value, "1" | "on" | "true" | "yes");
            if stats.online && stats.online_since.is_none() {
                stats.online_since = Some(Utc::now());
            }
        }
        "online_since" => stats.online_since = Some(parse_time("/set", value)?),
        "ytsong" => stats.youtube = Some(value.to_owned()),
        "spotify" => {
            // "song|artist"
            let (song, artist) = value.split_once('|').unwrap_or((value, ""));
            stats.spotify = Some(Song {
                song: song.trim().to_owned(),
                artist: artist.trim().to_owned(),
                is_playing: true,
                is_enabled: true,
            });
        }
        other => return Err(format!("/set: unknown stats field '{other}'")),
    }
    Ok(())
}

fn parse_time(directive: &str, s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("{directive}: invalid timestamp '{s}': {e}"))
}

// ── Registry directives ──────────────────────────────────────────────────────

/// `/adduser [-ofs] <name> <id>`
fn parse_adduser(tokens: &[String], world: &mut World) -> Result<(), String> {
    let opts = parse_opts(tokens, "");
    let pos = exactly("/adduser", "[-ofs] <name> <id>", &opts.positional, 2)?;
    world.add_user(User {
        username: pos[0].clone(),
        user_id: pos[1].clone(),
        is_online: opts.has('o'),
        is_follower: opts.has('f'),
        is_subscriber: opts.has('s'),
    });
    Ok(())
}

/// `/addevent [-t<rfc3339>] <kind> <username> [json]`
///
/// The payload is taken verbatim from the first `{` so its quotes survive.
fn parse_addevent(raw: &str, world: &mut World) -> Result<(), String> {
    let (head, payload) = match raw.find('{') {
        Some(at) => raw.split_at(at),
        None => (raw, ""),
    };
    let opts = parse_opts(&split_args(head), "t");
    let pos = exactly("/addevent", "[-t<time>] <kind> <username> [json]", &opts.positional, 2)?;
    let timestamp = match opts.value('t') {
        Some(t) => parse_time("/addevent", t)?,
        None => Utc::now(),
    };
    let values = if payload.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(payload).map_err(|e| format!("/addevent: invalid json: {e}"))?
    };
    world.add_event(Event {
        kind: pos[0].clone(),
        username: pos[1].clone(),
        timestamp,
        values,
    });
    Ok(())
}

/// `/addalias [-h] <alias>`
fn parse_addalias(tokens: &[String], world: &mut World) -> Result<(), String> {
    let opts = parse_opts(tokens, "");
    let pos = exactly("/addalias", "[-h] <alias>", &opts.positional, 1)?;
    world.add_alias(AliasEntry {
        alias: pos[0].clone(),
        visible: !opts.has('h'),
        enabled: true,
    });
    Ok(())
}

/// `/addcommand [-h] [-P<perm>]… <command>`
fn parse_addcommand(tokens: &[String], world: &mut World) -> Result<(), String> {
    let opts = parse_opts(tokens, "P");
    let pos = exactly("/addcommand", "[-h] [-P<perm>] <command>", &opts.positional, 1)?;
    world.add_command(CommandEntry {
        command: pos[0].clone(),
        visible: !opts.has('h'),
        enabled: true,
        permissions: opts.all_values('P').map(str::to_lowercase).collect(),
    });
    Ok(())
}

/// `/addcooldown <name> <ms>`
fn parse_addcooldown(tokens: &[String], world: &mut World) -> Result<(), String> {
    let pos = exactly("/addcooldown", "<name> <ms>", tokens, 2)?;
    world.add_cooldown(CooldownEntry {
        name: pos[0].clone(),
        millis: parse_num("/addcooldown", "duration", &pos[1])?,
        enabled: true,
    });
    Ok(())
}

/// `/addprice <command> <price>`
fn parse_addprice(tokens: &[String], world: &mut World) -> Result<(), String> {
    let pos = exactly("/addprice", "<command> <price>", tokens, 2)?;
    world.add_price(PriceEntry {
        command: pos[0].clone(),
        price: parse_num("/addprice", "price", &pos[1])?,
        enabled: true,
    });
    Ok(())
}

/// `/addrank <rank> <hours>`
fn parse_addrank(tokens: &[String], world: &mut World) -> Result<(), String> {
    let pos = exactly("/addrank", "<rank> <hours>", tokens, 2)?;
    world.add_rank(RankEntry {
        rank: pos[0].clone(),
        hours: parse_num("/addrank", "hours", &pos[1])?,
    });
    Ok(())
}

/// `/addvariable [-r<default|custom|command>] [-m<text>] [-e] <$_name> [value]`
fn parse_addvariable(tokens: &[String], world: &mut World) -> Result<(), String> {
    let opts = parse_opts(tokens, "rm");
    let Some((name, value)) = opts.positional.split_first() else {
        return Err("/addvariable: requires a variable name".into());
    };
    if !name.starts_with("$_") {
        return Err(format!("/addvariable: '{name}' must start with $_"));
    }
    let response_type = match opts.value('r').unwrap_or("default") {
        "default" => ResponseType::Default,
        "custom" => ResponseType::Custom,
        "command" => ResponseType::Command,
        other => return Err(format!("/addvariable: unknown response type '{other}'")),
    };
    world.set_variable(
        name,
        Variable {
            value: value.join(" "),
            response_type,
            response_text: opts.value('m').unwrap_or_default().to_owned(),
            is_eval: opts.has('e'),
        },
    );
    Ok(())
}

/// `/addusage <command> <count>`
fn parse_addusage(tokens: &[String], world: &mut World) -> Result<(), String> {
    let pos = exactly("/addusage", "<command> <count>", tokens, 2)?;
    world.set_usage(&pos[0], parse_num("/addusage", "count", &pos[1])?);
    Ok(())
}

/// `/addroute <url> <status> [body]`; the body is the raw rest of the line.
fn parse_addroute(raw: &str, world: &mut World) -> Result<(), String> {
    let mut parts = raw.splitn(3, |c: char| c.is_ascii_whitespace());
    let (Some(url), Some(status)) = (parts.next().filter(|u| !u.is_empty()), parts.next()) else {
        return Err("/addroute: usage: /addroute <url> <status> [body]".into());
    };
    let status = parse_num("/addroute", "status", status)?;
    world.route(url, status, parts.next().unwrap_or_default().trim());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        Broadcast, CommandUsage, EventLog, HttpFetcher, Points, Registry, Translator, UserDirectory,
        VariableStore,
    };

    // -- split_args -----------------------------------------------------------

    #[test]
    fn split_simple() {
        assert_eq!(split_args("foo bar baz"), ["foo", "bar", "baz"]);
    }

    #[test]
    fn split_quoted_spaces() {
        assert_eq!(split_args(r#""Just Chatting" 42"#), ["Just Chatting", "42"]);
    }

    #[test]
    fn split_escaped_quote_inside_quotes() {
        assert_eq!(split_args(r#""say \"hi\"""#), [r#"say "hi""#]);
    }

    #[test]
    fn split_keeps_empty_quoted_token() {
        assert_eq!(split_args(r#"a "" b"#), ["a", "", "b"]);
    }

    // -- flags ----------------------------------------------------------------

    #[test]
    fn opts_stop_at_first_positional() {
        let toks = split_args("-of -Pmods name -5");
        let opts = parse_opts(&toks, "P");
        assert!(opts.has('o') && opts.has('f'));
        assert_eq!(opts.value('P'), Some("mods"));
        assert_eq!(opts.positional, ["name", "-5"]);
    }

    // -- /set -----------------------------------------------------------------

    #[test]
    fn set_equals_syntax() {
        let (cfg, errs) = Config::load_str("/set main_currency=USD");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("main_currency"), Some("USD"));
    }

    #[test]
    fn set_value_with_spaces() {
        let (cfg, errs) = Config::load_str("/set spotify_format $song by $artist");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("spotify_format"), Some("$song by $artist"));
    }

    #[tokio::test]
    async fn set_stats_fields() {
        let (cfg, errs) = Config::load_str(
            "/set stats.viewers=42\n\
             /set stats.game=\"Just Chatting\"\n\
             /set stats.spotify=Song|Artist\n\
             /set stats.online=on",
        );
        assert!(errs.is_empty(), "{errs:?}");
        let stats = cfg.world.snapshot().await.unwrap();
        assert_eq!(stats.viewers, 42);
        assert_eq!(stats.game.as_deref(), Some("Just Chatting"));
        assert_eq!(stats.spotify.map(|s| s.artist), Some("Artist".into()));
        assert!(stats.online && stats.online_since.is_some());
    }

    #[test]
    fn set_bad_stat_is_error() {
        let (_, errs) = Config::load_str("/set stats.viewers=many\n/set stats.nope=1");
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].line, 1);
        assert_eq!(errs[1].line, 2);
    }

    #[tokio::test]
    async fn set_custom_variable_and_credentials() {
        let (cfg, errs) = Config::load_str("/set $_deaths=3\n/set access_token=abc\n/set points.singular=coin");
        assert!(errs.is_empty(), "{errs:?}");
        let w = &cfg.world;
        assert_eq!(VariableStore::get(w, "$_deaths", None, None).await.unwrap(), "3");
        assert_eq!(w.credentials().await.unwrap().unwrap().access_token, "abc");
        assert_eq!(w.name_for(1).await.unwrap(), "coin");
        assert_eq!(w.name_for(2).await.unwrap(), "points");
    }

    #[test]
    fn set_translation_override() {
        let (cfg, errs) = Config::load_str("/set translate.core.api.error=kaputt");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.world.translate("core.api.error"), "kaputt");
    }

    // -- registry -------------------------------------------------------------

    #[tokio::test]
    async fn adduser_flags() {
        let (cfg, errs) = Config::load_str("/adduser -os ann 1\n/adduser bob 2");
        assert!(errs.is_empty(), "{errs:?}");
        let ann = cfg.world.by_name("ann").await.unwrap().unwrap();
        assert!(ann.is_online && ann.is_subscriber && !ann.is_follower);
        assert_eq!(cfg.world.by_id("2").await.unwrap().unwrap().username, "bob");
    }

    #[tokio::test]
    async fn addevent_with_payload() {
        let (cfg, errs) = Config::load_str(
            r#"/addevent -t2024-01-01T10:00:00Z tip ann {"amount": 5, "currency": "USD"}"#,
        );
        assert!(errs.is_empty(), "{errs:?}");
        let tips = EventLog::all(&cfg.world, "tip").await.unwrap();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].value_f64("amount"), Some(5.0));
    }

    #[test]
    fn addevent_bad_json_is_error() {
        let (_, errs) = Config::load_str("/addevent tip ann {oops");
        assert_eq!(errs.len(), 1);
    }

    #[tokio::test]
    async fn registry_entries() {
        let (cfg, errs) = Config::load_str(
            "/addalias !hi\n\
             /addalias -h !secret\n\
             /addcommand -Pmoderators !ban\n\
             /addcooldown !hi 5000\n\
             /addprice !hi 10\n\
             /addrank Newbie 0",
        );
        assert!(errs.is_empty(), "{errs:?}");
        let w = &cfg.world;
        let aliases = w.aliases().await.unwrap();
        assert_eq!(aliases.len(), 2);
        assert!(!aliases[1].visible);
        assert_eq!(w.commands().await.unwrap()[0].permissions, ["moderators"]);
        assert_eq!(w.cooldowns().await.unwrap()[0].millis, 5000);
        assert_eq!(w.prices().await.unwrap()[0].price, 10);
        assert_eq!(w.ranks().await.unwrap()[0].rank, "Newbie");
    }

    #[tokio::test]
    async fn addvariable_modes() {
        let (cfg, errs) = Config::load_str(r#"/addvariable -rcustom -m"set to $value" $_mood happy"#);
        assert!(errs.is_empty(), "{errs:?}");
        let var = cfg.world.variable("$_mood").await.unwrap();
        assert_eq!(var.response_type, ResponseType::Custom);
        assert_eq!(var.response_text, "set to $value");
        assert_eq!(var.value, "happy");
    }

    #[test]
    fn addvariable_rejects_bad_names() {
        let (_, errs) = Config::load_str("/addvariable mood\n/addvariable -rloud $_x");
        assert_eq!(errs.len(), 2);
    }

    #[tokio::test]
    async fn usage_and_routes() {
        let (cfg, errs) = Config::load_str("/addusage !hi 7\n/addroute https://x/ok 200 {\"a\":1}");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.world.count("!hi").await.unwrap(), 7);
        let resp = HttpFetcher::get(&cfg.world, "https://x/ok", &[]).await.unwrap();
        assert_eq!(resp.body, r#"{"a":1}"#);
    }

    #[test]
    fn usage_errors() {
        let (_, errs) = Config::load_str("/addcooldown !hi\n/addprice !hi lots\n/adduser ann");
        assert_eq!(errs.len(), 3);
    }

    // -- Comments & skipping --------------------------------------------------

    #[test]
    fn semicolon_comments_ignored() {
        let (cfg, errs) = Config::load_str(
            ";; This is a comment\n\
             ; Also a comment\n\
             /set bot_username=bot",
        );
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("bot_username"), Some("bot"));
        assert_eq!(cfg.vars.len(), 1);
    }

    #[test]
    fn unknown_directives_silently_skipped() {
        let (cfg, errs) = Config::load_str("/def something\n/set loaded=yes");
        assert!(errs.is_empty(), "{errs:?}");
        assert!(cfg.vars.contains("loaded"));
    }

    #[test]
    fn load_file_reads_from_disk() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "/set broadcaster_username=streamer").unwrap();
        let (cfg, errs) = Config::load_file(file.path()).unwrap();
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.vars.get("broadcaster_username"), Some("streamer"));
    }
}
