//! In-memory implementation of every collaborator.
//!
//! [`World`] backs the command-line tool and the test-suite.  It is filled
//! by the config loader (or directly through its builder methods), then
//! shared as `Arc<World>`; [`World::services`] hands the same instance out
//! behind every trait.  Side effects the engine triggers (dispatched
//! commands, chat lines, HTTP requests) are recorded for inspection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::script::Sandbox;
use crate::services::{
    AliasEntry, Broadcast, ChatSender, CommandDispatcher, CommandEntry, CommandUsage,
    CooldownEntry, Credentials, CurrencyConverter, DispatchOptions, Event, EventLog, HttpFetcher,
    HttpResponse, Points, PriceEntry, RankEntry, Registry, ResponseType, Sender, Services,
    SetOutcome, StatsSnapshot, Translator, User, UserDirectory, UserFilter, VariableStore,
};

/// Default permission groups, by name; ids equal names.
const PERMISSION_GROUPS: &[&str] = &["casters", "moderators", "vip", "subscribers", "followers", "viewers"];

const TRANSLATIONS: &[(&str, &str)] = &[
    ("songs.not-playing", "not playing"),
    ("core.api.error", "API error"),
    ("core.api.not-available", "not available"),
    ("filters.setVariable", "$variable was set to $value."),
];

// ── Records kept by the world ─────────────────────────────────────────────────

/// A custom variable as stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variable {
    pub value: String,
    pub response_type: ResponseType,
    /// Response for [`ResponseType::Custom`]; `$value` is the new value.
    pub response_text: String,
    /// Script variables are announced by their script, not the bot.
    pub is_eval: bool,
}

/// A command the engine dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub sender: Sender,
    pub text: String,
    pub opts: DispatchOptions,
}

/// A chat line the engine sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentLine {
    pub text: String,
    pub sender: Sender,
    pub quiet: bool,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    events: Vec<Event>,
    usage: HashMap<String, u64>,
    /// Value of one unit of each currency in a common base.
    rates: HashMap<String, f64>,
    variables: HashMap<String, Variable>,
    routes: HashMap<String, HttpResponse>,
    stats: StatsSnapshot,
    credentials: Option<Credentials>,
    aliases: Vec<AliasEntry>,
    commands: Vec<CommandEntry>,
    cooldowns: Vec<CooldownEntry>,
    prices: Vec<PriceEntry>,
    ranks: Vec<RankEntry>,
    points: (String, String),
    dispatched: Vec<Dispatched>,
    sent: Vec<SentLine>,
    fetched: Vec<String>,
}

// ── World ─────────────────────────────────────────────────────────────────────

/// In-memory bot world.
#[derive(Debug)]
pub struct World {
    state: RwLock<State>,
    translations: HashMap<String, String>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let state = State {
            points: ("point".to_owned(), "points".to_owned()),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
            translations: TRANSLATIONS
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        }
    }

    /// Bundle this world as every collaborator, with the built-in sandbox as
    /// evaluator.
    pub fn services(self: &Arc<Self>) -> Services {
        Services {
            users: self.clone(),
            events: self.clone(),
            usage: self.clone(),
            currency: self.clone(),
            dispatcher: self.clone(),
            variables: self.clone(),
            http: self.clone(),
            expressions: Arc::new(Sandbox),
            arithmetic: Arc::new(Sandbox),
            broadcast: self.clone(),
            registry: self.clone(),
            points: self.clone(),
            chat: self.clone(),
            translator: self.clone(),
        }
    }

    // ── Builders (used before the world is shared) ───────────────────────────

    pub fn add_user(&mut self, user: User) {
        let users = &mut self.state.get_mut().users;
        users.retain(|u| u.user_id != user.user_id);
        users.push(user);
    }

    pub fn add_event(&mut self, event: Event) {
        self.state.get_mut().events.push(event);
    }

    pub fn set_usage(&mut self, command: &str, count: u64) {
        self.state.get_mut().usage.insert(command.to_owned(), count);
    }

    pub fn set_rate(&mut self, currency: &str, rate: f64) {
        self.state.get_mut().rates.insert(currency.to_uppercase(), rate);
    }

    pub fn set_variable(&mut self, name: &str, var: Variable) {
        self.state.get_mut().variables.insert(name.to_owned(), var);
    }

    pub fn route(&mut self, url: &str, status: u16, body: &str) {
        self.state.get_mut().routes.insert(
            url.to_owned(),
            HttpResponse {
                status,
                body: body.to_owned(),
            },
        );
    }

    pub fn stats_mut(&mut self) -> &mut StatsSnapshot {
        &mut self.state.get_mut().stats
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.state.get_mut().credentials = Some(credentials);
    }

    pub fn credentials_mut(&mut self) -> &mut Credentials {
        self.state.get_mut().credentials.get_or_insert_with(Credentials::default)
    }

    pub fn add_alias(&mut self, entry: AliasEntry) {
        self.state.get_mut().aliases.push(entry);
    }

    pub fn add_command(&mut self, entry: CommandEntry) {
        self.state.get_mut().commands.push(entry);
    }

    pub fn add_cooldown(&mut self, entry: CooldownEntry) {
        self.state.get_mut().cooldowns.push(entry);
    }

    pub fn add_price(&mut self, entry: PriceEntry) {
        self.state.get_mut().prices.push(entry);
    }

    pub fn add_rank(&mut self, entry: RankEntry) {
        self.state.get_mut().ranks.push(entry);
    }

    pub fn set_points_names(&mut self, singular: &str, plural: &str) {
        self.state.get_mut().points = (singular.to_owned(), plural.to_owned());
    }

    pub fn set_translation(&mut self, key: &str, text: &str) {
        self.translations.insert(key.to_owned(), text.to_owned());
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    pub async fn dispatched(&self) -> Vec<Dispatched> {
        self.state.read().await.dispatched.clone()
    }

    pub async fn sent(&self) -> Vec<SentLine> {
        self.state.read().await.sent.clone()
    }

    /// URLs requested through [`HttpFetcher`], in order.
    pub async fn fetched(&self) -> Vec<String> {
        self.state.read().await.fetched.clone()
    }

    pub async fn variable(&self, name: &str) -> Option<Variable> {
        self.state.read().await.variables.get(name).cloned()
    }

    /// Flip the live flag after the world is shared.
    pub async fn set_online(&self, online: bool, since: Option<DateTime<Utc>>) {
        let mut state = self.state.write().await;
        state.stats.online = online;
        state.stats.online_since = since;
    }
}

// ── Collaborator impls ────────────────────────────────────────────────────────

#[async_trait]
impl UserDirectory for World {
    async fn by_name(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn by_id(&self, user_id: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn create(&self, user_id: &str, username: &str) -> Result<User> {
        let user = User {
            user_id: user_id.to_owned(),
            username: username.to_owned(),
            ..User::default()
        };
        self.state.write().await.users.push(user.clone());
        Ok(user)
    }

    async fn all(&self) -> Result<Vec<User>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn query(&self, filter: UserFilter) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }
}

#[async_trait]
impl EventLog for World {
    async fn latest(&self, kinds: &[&str]) -> Result<Option<Event>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| kinds.contains(&e.kind.as_str()))
            .max_by_key(|e| e.timestamp)
            .cloned())
    }

    async fn all(&self, kind: &str) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state.events.iter().filter(|e| e.kind == kind).cloned().collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }
}

#[async_trait]
impl CommandUsage for World {
    async fn count(&self, command: &str) -> Result<u64> {
        Ok(self.state.read().await.usage.get(command).copied().unwrap_or(0))
    }
}

#[async_trait]
impl CurrencyConverter for World {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        let state = self.state.read().await;
        let rate = |code: &str| state.rates.get(&code.to_uppercase()).copied().unwrap_or(1.0);
        let to_rate = rate(to);
        if to_rate == 0.0 {
            return Err(Error::Service(format!("no exchange rate for {to}")));
        }
        Ok(amount * rate(from) / to_rate)
    }
}

#[async_trait]
impl CommandDispatcher for World {
    async fn dispatch(&self, sender: &Sender, text: &str, opts: DispatchOptions) -> Result<()> {
        let mut state = self.state.write().await;
        *state.usage.entry(text.split_whitespace().next().unwrap_or_default().to_owned()).or_default() += 1;
        state.dispatched.push(Dispatched {
            sender: sender.clone(),
            text: text.to_owned(),
            opts,
        });
        Ok(())
    }
}

#[async_trait]
impl VariableStore for World {
    async fn get(&self, name: &str, _sender: Option<&Sender>, _param: Option<&str>) -> Result<String> {
        let state = self.state.read().await;
        Ok(state.variables.get(name).map(|v| v.value.clone()).unwrap_or_default())
    }

    async fn set(&self, name: &str, value: &str, _sender: &Sender) -> Result<SetOutcome> {
        let mut state = self.state.write().await;
        let var = state.variables.entry(name.to_owned()).or_default();
        var.value = value.to_owned();
        Ok(SetOutcome {
            is_ok: true,
            is_eval: var.is_eval,
            set_value: value.to_owned(),
            response_type: var.response_type,
            response_text: var.response_text.clone(),
            current_value: var.value.clone(),
        })
    }

    async fn is_set(&self, name: &str) -> Result<bool> {
        Ok(self.state.read().await.variables.contains_key(name))
    }
}

#[async_trait]
impl HttpFetcher for World {
    async fn get(&self, url: &str, _headers: &[(String, String)]) -> Result<HttpResponse> {
        let mut state = self.state.write().await;
        state.fetched.push(url.to_owned());
        state
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Http(format!("no route for {url}")))
    }
}

#[async_trait]
impl Broadcast for World {
    async fn snapshot(&self) -> Result<StatsSnapshot> {
        Ok(self.state.read().await.stats.clone())
    }

    async fn credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.state.read().await.credentials.clone())
    }
}

#[async_trait]
impl Registry for World {
    async fn aliases(&self) -> Result<Vec<AliasEntry>> {
        Ok(self.state.read().await.aliases.clone())
    }

    async fn commands(&self) -> Result<Vec<CommandEntry>> {
        Ok(self.state.read().await.commands.clone())
    }

    async fn cooldowns(&self) -> Result<Vec<CooldownEntry>> {
        Ok(self.state.read().await.cooldowns.clone())
    }

    async fn prices(&self) -> Result<Vec<PriceEntry>> {
        Ok(self.state.read().await.prices.clone())
    }

    async fn ranks(&self) -> Result<Vec<RankEntry>> {
        Ok(self.state.read().await.ranks.clone())
    }

    async fn permission(&self, name: &str) -> Result<Option<String>> {
        let name = name.to_lowercase();
        Ok(PERMISSION_GROUPS.contains(&name.as_str()).then_some(name))
    }
}

#[async_trait]
impl Points for World {
    async fn name_for(&self, amount: i64) -> Result<String> {
        let state = self.state.read().await;
        let (singular, plural) = &state.points;
        Ok(if amount.abs() == 1 { singular.clone() } else { plural.clone() })
    }
}

#[async_trait]
impl ChatSender for World {
    async fn send(&self, text: &str, sender: &Sender, quiet: bool) -> Result<()> {
        self.state.write().await.sent.push(SentLine {
            text: text.to_owned(),
            sender: sender.clone(),
            quiet,
        });
        Ok(())
    }
}

impl Translator for World {
    fn translate(&self, key: &str) -> String {
        self.translations.get(key).cloned().unwrap_or_else(|| key.to_owned())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(id: &str, name: &str, online: bool) -> User {
        User {
            user_id: id.into(),
            username: name.into(),
            is_online: online,
            ..User::default()
        }
    }

    #[tokio::test]
    async fn users_lookup_is_case_insensitive() {
        let mut world = World::new();
        world.add_user(user("1", "Ann", true));
        assert_eq!(world.by_name("ann").await.unwrap().map(|u| u.user_id), Some("1".into()));
        assert!(world.by_id("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_filters_users() {
        let mut world = World::new();
        world.add_user(user("1", "ann", true));
        world.add_user(user("2", "bob", false));
        let online = world
            .query(UserFilter { online: Some(true), ..UserFilter::default() })
            .await
            .unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].username, "ann");
    }

    #[tokio::test]
    async fn latest_event_across_kinds() {
        let mut world = World::new();
        for (kind, name, secs) in [("sub", "a", 10), ("resub", "b", 30), ("follow", "c", 50)] {
            world.add_event(Event {
                kind: kind.into(),
                username: name.into(),
                timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
                values: serde_json::Value::Null,
            });
        }
        let latest = world.latest(&["sub", "resub"]).await.unwrap().unwrap();
        assert_eq!(latest.username, "b");
        assert!(world.latest(&["tip"]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn variables_round_trip() {
        let world = World::new();
        let sender = Sender::new("ann", "1");
        assert_eq!(VariableStore::get(&world, "$_x", None, None).await.unwrap(), "");
        let outcome = world.set("$_x", "5", &sender).await.unwrap();
        assert_eq!(outcome.current_value, "5");
        assert_eq!(outcome.response_type, ResponseType::Default);
        assert_eq!(VariableStore::get(&world, "$_x", None, None).await.unwrap(), "5");
        assert!(world.is_set("$_x").await.unwrap());
    }

    #[tokio::test]
    async fn currency_conversion_uses_rates() {
        let mut world = World::new();
        world.set_rate("EUR", 1.0);
        world.set_rate("USD", 0.5);
        assert_eq!(world.convert(10.0, "USD", "EUR").await.unwrap(), 5.0);
        assert_eq!(world.convert(10.0, "XYZ", "EUR").await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn unrouted_fetch_fails_and_is_recorded() {
        let world = World::new();
        assert!(HttpFetcher::get(&world, "https://x", &[]).await.is_err());
        assert_eq!(world.fetched().await, ["https://x"]);
    }

    #[test]
    fn translations_fall_back_to_key() {
        let world = World::new();
        assert_eq!(world.translate("songs.not-playing"), "not playing");
        assert_eq!(world.translate("no.such.key"), "no.such.key");
    }
}
