//! Setting store and the typed engine settings read from it.
//!
//! The config loader writes every `/set name=value` line into a [`VarStore`];
//! [`Settings::from_vars`] then picks out the names the engine understands.

use std::collections::HashMap;

/// Plain string-valued key/value table filled by the config loader.
#[derive(Debug, Default, Clone)]
pub struct VarStore {
    vars: HashMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Get the value of a variable parsed as an integer.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.vars.get(name)?.trim().parse().ok()
    }

    /// Boolean flags accept `1/0`, `on/off`, `true/false`, `yes/no`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.vars.get(name)?.trim().to_ascii_lowercase().as_str() {
            "1" | "on" | "true" | "yes" => Some(true),
            "0" | "off" | "false" | "no" => Some(false),
            _ => None,
        }
    }

    /// Comma-separated list, entries trimmed, empties dropped.
    pub fn get_list(&self, name: &str) -> Vec<String> {
        self.vars
            .get(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Render mentions as `@name`.
    pub show_with_at: bool,
    pub bot_username: String,
    pub broadcaster_username: String,
    /// Usernames never picked by `(random.*)`.
    pub ignored: Vec<String>,
    /// Currency top tips are ranked in.
    pub main_currency: String,
    pub price_enabled: bool,
    pub songs_enabled: bool,
    /// Template for `$spotifySong`; `$song` and `$artist` are substituted.
    pub spotify_format: String,
    /// Rendered by `$version`.
    pub version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_with_at: true,
            bot_username: String::new(),
            broadcaster_username: String::new(),
            ignored: Vec::new(),
            main_currency: "EUR".to_owned(),
            price_enabled: true,
            songs_enabled: true,
            spotify_format: "$song - $artist".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl Settings {
    /// Build settings from `vars`, falling back to defaults for anything
    /// unset or malformed.
    pub fn from_vars(vars: &VarStore) -> Self {
        let d = Self::default();
        let text = |name: &str, fallback: String| {
            vars.get(name).map(str::to_owned).unwrap_or(fallback)
        };
        Self {
            show_with_at: vars.get_bool("show_with_at").unwrap_or(d.show_with_at),
            bot_username: text("bot_username", d.bot_username),
            broadcaster_username: text("broadcaster_username", d.broadcaster_username),
            ignored: if vars.contains("ignored") {
                vars.get_list("ignored")
            } else {
                d.ignored
            },
            main_currency: text("main_currency", d.main_currency),
            price_enabled: vars.get_bool("price_enabled").unwrap_or(d.price_enabled),
            songs_enabled: vars.get_bool("songs_enabled").unwrap_or(d.songs_enabled),
            spotify_format: text("spotify_format", d.spotify_format),
            version: text("version", d.version),
        }
    }

    /// `username` formatted as a mention.
    pub fn mention(&self, username: &str) -> String {
        if self.show_with_at {
            format!("@{username}")
        } else {
            username.to_owned()
        }
    }

    /// Bot, broadcaster and ignored accounts are never picked at random.
    pub fn is_excluded(&self, username: &str) -> bool {
        let name = username.to_lowercase();
        name == self.bot_username.to_lowercase()
            || name == self.broadcaster_username.to_lowercase()
            || self.ignored.iter().any(|i| i.to_lowercase() == name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
