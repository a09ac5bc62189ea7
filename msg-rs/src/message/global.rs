//! Global placeholders: stream statistics, latest events and songs.
//!
//! All placeholders are literal, so they are replaced in a single
//! leftmost-longest scan; `$latestTipAmount` is never read as `$latestTip`.

use aho_corasick::{AhoCorasickBuilder, MatchKind};
use tracing::warn;

use super::{Engine, GlobalOptions, Message};
use crate::entity;
use crate::services::{Event, StatsSnapshot};

const NA: &str = "n/a";

const PLACEHOLDERS: &[&str] = &[
    "$game",
    "$viewers",
    "$views",
    "$followers",
    "$hosts",
    "$subscribers",
    "$bits",
    "$title",
    "$version",
    "$latestFollower",
    "$latestSubscriber",
    "$latestTipAmount",
    "$latestTipCurrency",
    "$latestTipMessage",
    "$latestTip",
    "$latestCheerAmount",
    "$latestCheerMessage",
    "$latestCheer",
    "$spotifySong",
    "$ytSong",
];

impl Message<'_> {
    /// Replace every global placeholder and return the entity-decoded text.
    pub async fn global(&mut self, opts: &GlobalOptions) -> String {
        let present: Vec<&str> = PLACEHOLDERS
            .iter()
            .copied()
            .filter(|p| self.text.contains(p))
            .collect();
        if !present.is_empty() {
            let values = Values::load(self.engine, &present).await;
            let replacements: Vec<String> = present.iter().map(|p| values.render(self.engine, p, opts)).collect();
            let ac = AhoCorasickBuilder::new()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&present);
            self.text = ac.replace_all(&self.text, &replacements);
        }
        self.text = entity::decode(&self.text);
        self.text.clone()
    }
}

/// Data behind the placeholders, loaded once per call.
#[derive(Default)]
struct Values {
    stats: StatsSnapshot,
    follower: Option<Event>,
    subscriber: Option<Event>,
    tip: Option<Event>,
    cheer: Option<Event>,
}

impl Values {
    async fn load(engine: &Engine, present: &[&str]) -> Self {
        let wants = |prefix: &str| present.iter().any(|p| p.starts_with(prefix));
        let stats = match engine.services.broadcast.snapshot().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "stats snapshot unavailable");
                StatsSnapshot::default()
            }
        };
        let mut values = Values {
            stats,
            ..Values::default()
        };
        if wants("$latestFollower") {
            values.follower = latest(engine, &["follow"]).await;
        }
        if wants("$latestSubscriber") {
            values.subscriber = latest(engine, &["sub", "resub", "subgift"]).await;
        }
        if wants("$latestTip") {
            values.tip = latest(engine, &["tip"]).await;
        }
        if wants("$latestCheer") {
            values.cheer = latest(engine, &["cheer"]).await;
        }
        values
    }

    fn render(&self, engine: &Engine, placeholder: &str, opts: &GlobalOptions) -> String {
        let s = &self.stats;
        let settings = engine.settings();
        match placeholder {
            "$game" => s.game.clone().unwrap_or_else(|| NA.to_owned()),
            "$title" => s.title.clone().unwrap_or_else(|| NA.to_owned()),
            "$viewers" => s.viewers.to_string(),
            "$views" => s.views.to_string(),
            "$followers" => s.followers.to_string(),
            "$hosts" => s.hosts.to_string(),
            "$subscribers" => s.subscribers.to_string(),
            "$bits" => s.bits.to_string(),
            "$version" => settings.version.clone(),
            "$latestFollower" => or_na(self.follower.as_ref().map(|e| e.username.clone())),
            "$latestSubscriber" => or_na(self.subscriber.as_ref().map(|e| e.username.clone())),
            "$latestTipAmount" => or_na(
                self.tip
                    .as_ref()
                    .map(|e| format!("{:.2}", e.value_f64("amount").unwrap_or(0.0))),
            ),
            "$latestTipCurrency" => or_na(self.tip.as_ref().and_then(|e| e.value_str("currency"))),
            "$latestTipMessage" => or_na(self.tip.as_ref().and_then(|e| e.value_str("message"))),
            "$latestTip" => or_na(self.tip.as_ref().map(event_user)),
            "$latestCheerAmount" => or_na(
                self.cheer
                    .as_ref()
                    .map(|e| (e.value_f64("amount").unwrap_or(0.0).trunc() as i64).to_string()),
            ),
            "$latestCheerMessage" => or_na(self.cheer.as_ref().and_then(|e| e.value_str("message"))),
            "$latestCheer" => or_na(self.cheer.as_ref().map(event_user)),
            "$spotifySong" => match &s.spotify {
                Some(song) if song.is_playing && song.is_enabled => settings
                    .spotify_format
                    .replace("$song", &escape(&song.song, opts))
                    .replace("$artist", &escape(&song.artist, opts)),
                _ => engine.services.translator.translate("songs.not-playing"),
            },
            "$ytSong" => match &s.youtube {
                Some(title) if settings.songs_enabled => escape(title, opts),
                _ => engine.services.translator.translate("songs.not-playing"),
            },
            _ => placeholder.to_owned(),
        }
    }
}

async fn latest(engine: &Engine, kinds: &[&str]) -> Option<Event> {
    match engine.services.events.latest(kinds).await {
        Ok(event) => event,
        Err(e) => {
            warn!(?kinds, error = %e, "event lookup failed");
            None
        }
    }
}

/// Tip and cheer payloads may carry the display name of the giver.
fn event_user(event: &Event) -> String {
    event.value_str("username").unwrap_or_else(|| event.username.clone())
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NA.to_owned())
}

fn escape(text: &str, opts: &GlobalOptions) -> String {
    match opts.escape.as_deref() {
        Some(esc) if !esc.is_empty() => text.replace(esc, &format!("\\{esc}")),
        _ => text.to_owned(),
    }
}
