//! Collaborator interfaces consumed by the template engine.
//!
//! The engine never touches storage, the network or the chat socket
//! directly.  Every lookup goes through one of the traits below, bundled in
//! [`Services`].  [`crate::memory::World`] implements all of them in memory;
//! a production bot supplies its own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, ScriptError};
use crate::script::{Scope, Value};

// ── Records ──────────────────────────────────────────────────────────────────

/// The user a message is rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sender {
    pub username: String,
    pub user_id: String,
}

impl Sender {
    pub fn new(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub is_online: bool,
    pub is_follower: bool,
    pub is_subscriber: bool,
}

impl User {
    /// Script-facing shape: `{ userId, username, is: { online, follower, subscriber } }`.
    pub fn to_value(&self) -> Value {
        Value::from_json(serde_json::json!({
            "userId": self.user_id,
            "username": self.username,
            "is": self.flags_json(),
        }))
    }

    /// Membership flags as exposed to scripts through `is`.
    pub fn flags(&self) -> Value {
        Value::from_json(self.flags_json())
    }

    fn flags_json(&self) -> serde_json::Value {
        serde_json::json!({
            "online": self.is_online,
            "follower": self.is_follower,
            "subscriber": self.is_subscriber,
        })
    }
}

/// Filter for [`UserDirectory::query`]; `None` fields do not constrain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub online: Option<bool>,
    pub follower: Option<bool>,
    pub subscriber: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.online.map_or(true, |v| user.is_online == v)
            && self.follower.map_or(true, |v| user.is_follower == v)
            && self.subscriber.map_or(true, |v| user.is_subscriber == v)
    }
}

/// One entry of the event log (follow, sub, tip, cheer, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
    /// Free-form payload (`amount`, `currency`, `message`, ...).
    pub values: serde_json::Value,
}

impl Event {
    pub fn value_str(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn value_f64(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Currently playing track reported by the music integration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Song {
    pub song: String,
    pub artist: String,
    pub is_playing: bool,
    pub is_enabled: bool,
}

/// Read-only view of live stream statistics, taken once per message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsSnapshot {
    pub game: Option<String>,
    pub title: Option<String>,
    pub viewers: u64,
    pub views: u64,
    pub followers: u64,
    pub hosts: u64,
    pub subscribers: u64,
    pub bits: u64,
    pub online: bool,
    /// When the current stream went live.
    pub online_since: Option<DateTime<Utc>>,
    pub spotify: Option<Song>,
    /// Title of the song request currently playing, if any.
    pub youtube: Option<String>,
}

/// Platform API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub access_token: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias: String,
    pub visible: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: String,
    pub visible: bool,
    pub enabled: bool,
    /// Permission ids of the command's responses.
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownEntry {
    pub name: String,
    pub millis: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub command: String,
    pub price: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub rank: String,
    pub hours: u64,
}

/// How a custom variable reacts to being set from chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Announce the new value and substitute it.
    #[default]
    Default,
    /// Send the variable's own response text and substitute nothing.
    Custom,
    /// Substitute the new value silently.
    Command,
}

/// Result of [`VariableStore::set`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetOutcome {
    pub is_ok: bool,
    /// The variable is script-evaluated; setting it produces no announcement.
    pub is_eval: bool,
    pub set_value: String,
    pub response_type: ResponseType,
    pub response_text: String,
    pub current_value: String,
}

/// Options forwarded to the command dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOptions {
    /// Skip cooldown and permission checks.
    pub skip: bool,
    /// Suppress the dispatched command's own output.
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// The body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

// ── Collaborators ────────────────────────────────────────────────────────────

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn by_name(&self, username: &str) -> Result<Option<User>>;
    async fn by_id(&self, user_id: &str) -> Result<Option<User>>;
    async fn create(&self, user_id: &str, username: &str) -> Result<User>;
    async fn all(&self) -> Result<Vec<User>>;
    async fn query(&self, filter: UserFilter) -> Result<Vec<User>>;
}

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Most recent event whose kind is one of `kinds`.
    async fn latest(&self, kinds: &[&str]) -> Result<Option<Event>>;
    /// Every event of `kind`, newest first.
    async fn all(&self, kind: &str) -> Result<Vec<Event>>;
}

#[async_trait]
pub trait CommandUsage: Send + Sync {
    async fn count(&self, command: &str) -> Result<u64>;
}

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64>;
}

#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(&self, sender: &Sender, text: &str, opts: DispatchOptions) -> Result<()>;
}

#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Current value of `name` (including the `$_` prefix).
    async fn get(&self, name: &str, sender: Option<&Sender>, param: Option<&str>) -> Result<String>;
    async fn set(&self, name: &str, value: &str, sender: &Sender) -> Result<SetOutcome>;
    async fn is_set(&self, name: &str) -> Result<bool>;
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse>;
}

/// Sandboxed evaluation for `(if ...)` and `(eval ...)`.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate_boolean(&self, expr: &str) -> std::result::Result<bool, ScriptError>;
    fn evaluate_sandboxed(&self, script: &str, scope: Scope) -> std::result::Result<Value, ScriptError>;
}

/// Numeric evaluation for `(math. ...)`.
pub trait ArithmeticEvaluator: Send + Sync {
    fn evaluate(&self, expr: &str) -> std::result::Result<f64, ScriptError>;
}

#[async_trait]
pub trait Broadcast: Send + Sync {
    async fn snapshot(&self) -> Result<StatsSnapshot>;
    async fn credentials(&self) -> Result<Option<Credentials>>;
}

#[async_trait]
pub trait Registry: Send + Sync {
    async fn aliases(&self) -> Result<Vec<AliasEntry>>;
    async fn commands(&self) -> Result<Vec<CommandEntry>>;
    async fn cooldowns(&self) -> Result<Vec<CooldownEntry>>;
    async fn prices(&self) -> Result<Vec<PriceEntry>>;
    async fn ranks(&self) -> Result<Vec<RankEntry>>;
    /// Resolve a permission group name to its id.
    async fn permission(&self, name: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait Points: Send + Sync {
    /// Points label for `amount` (singular/plural).
    async fn name_for(&self, amount: i64) -> Result<String>;
}

#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, text: &str, sender: &Sender, quiet: bool) -> Result<()>;
}

pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> String;
}

// ── Bundle ───────────────────────────────────────────────────────────────────

/// Every collaborator the engine calls, as shared trait objects.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserDirectory>,
    pub events: Arc<dyn EventLog>,
    pub usage: Arc<dyn CommandUsage>,
    pub currency: Arc<dyn CurrencyConverter>,
    pub dispatcher: Arc<dyn CommandDispatcher>,
    pub variables: Arc<dyn VariableStore>,
    pub http: Arc<dyn HttpFetcher>,
    pub expressions: Arc<dyn ExpressionEvaluator>,
    pub arithmetic: Arc<dyn ArithmeticEvaluator>,
    pub broadcast: Arc<dyn Broadcast>,
    pub registry: Arc<dyn Registry>,
    pub points: Arc<dyn Points>,
    pub chat: Arc<dyn ChatSender>,
    pub translator: Arc<dyn Translator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_only_constrained_fields() {
        let user = User {
            user_id: "1".into(),
            username: "ann".into(),
            is_online: true,
            is_follower: false,
            is_subscriber: true,
        };
        assert!(UserFilter::default().matches(&user));
        assert!(UserFilter { online: Some(true), ..Default::default() }.matches(&user));
        assert!(!UserFilter { follower: Some(true), ..Default::default() }.matches(&user));
    }

    #[test]
    fn user_value_exposes_flags() {
        let user = User {
            username: "ann".into(),
            is_follower: true,
            ..Default::default()
        };
        let v = user.to_value();
        assert_eq!(v.member("username"), Value::from("ann"));
        assert_eq!(v.member("is").member("follower"), Value::Bool(true));
    }

    #[test]
    fn event_values_coerce() {
        let ev = Event {
            kind: "tip".into(),
            username: "ann".into(),
            timestamp: Utc::now(),
            values: serde_json::json!({"amount": "12.5", "currency": "EUR", "n": 3}),
        };
        assert_eq!(ev.value_f64("amount"), Some(12.5));
        assert_eq!(ev.value_str("currency").as_deref(), Some("EUR"));
        assert_eq!(ev.value_str("n").as_deref(), Some("3"));
        assert_eq!(ev.value_str("missing"), None);
    }
}
