//! End-to-end tests: messages rendered through the full pipeline against an
//! in-memory world.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;

use chatmsg::config::Config;
use chatmsg::memory::{Variable, World};
use chatmsg::services::{
    AliasEntry, CommandDispatcher, CommandEntry, CooldownEntry, Credentials, DispatchOptions, Event,
    PriceEntry, RankEntry, ResponseType, Sender, User,
};
use chatmsg::var::Settings;
use chatmsg::{overlay, Context, Engine, GlobalOptions};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn build(world: World, settings: Settings) -> (Arc<World>, Engine) {
    let world = Arc::new(world);
    let engine = Engine::new(world.services(), settings).unwrap();
    (world, engine)
}

fn empty() -> (Arc<World>, Engine) {
    build(World::new(), Settings::default())
}

fn ann() -> Context {
    Context::new(Sender::new("ann", "1"))
}

fn user(id: &str, name: &str, online: bool, follower: bool, subscriber: bool) -> User {
    User {
        user_id: id.into(),
        username: name.into(),
        is_online: online,
        is_follower: follower,
        is_subscriber: subscriber,
    }
}

fn event(kind: &str, username: &str, minute: u32, values: serde_json::Value) -> Event {
    Event {
        kind: kind.into(),
        username: username.into(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        values,
    }
}

// ── Literal text ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn literal_text_is_unchanged() {
    let (_, engine) = empty();
    for text in ["Hello there, friend.", "no tokens here", "a | b | c", "100% sure"] {
        assert_eq!(engine.parse(text, &ann()).await, text);
    }
}

#[tokio::test]
async fn entities_are_decoded() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("fish &amp; chips", &ann()).await, "fish & chips");
}

// ── Global placeholders ───────────────────────────────────────────────────────

#[tokio::test]
async fn viewers_and_game() {
    let mut world = World::new();
    world.stats_mut().viewers = 42;
    world.stats_mut().game = Some("Chess".into());
    let (_, engine) = build(world, Settings::default());
    assert_eq!(engine.parse("$viewers viewers, $game", &ann()).await, "42 viewers, Chess");
}

#[tokio::test]
async fn global_only_skips_tokens() {
    let mut world = World::new();
    world.stats_mut().title = Some("Speedrun".into());
    world.add_event(event("follow", "zed", 1, json!({})));
    let (_, engine) = build(world, Settings::default());
    let out = engine
        .global("$title by $latestFollower (game)", &GlobalOptions::default())
        .await;
    assert_eq!(out, "Speedrun by zed (game)");
}

#[tokio::test]
async fn missing_globals_render_na() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("$game / $latestTip", &ann()).await, "n/a / n/a");
}

// ── Info pass ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn price_of_current_command() {
    let mut world = World::new();
    world.add_price(PriceEntry {
        command: "!hug".into(),
        price: 5,
        enabled: true,
    });
    let (_, engine) = build(world, Settings::default());
    let ctx = ann().with_cmd("!hug");
    assert_eq!(engine.parse("Costs (price)", &ctx).await, "Costs 5 points");
    assert_eq!(engine.parse("Costs (price)", &ann()).await, "Costs 0 points");
}

#[tokio::test]
async fn top_tip_is_ranked_in_main_currency() {
    let mut world = World::new();
    world.set_rate("EUR", 1.0);
    world.set_rate("USD", 0.5);
    world.add_event(event("tip", "ann", 1, json!({"amount": 6, "currency": "EUR", "message": "gg"})));
    world.add_event(event("tip", "bob", 2, json!({"amount": 10, "currency": "USD", "message": "hi"})));
    let (_, engine) = build(world, Settings::default());

    let out = engine
        .parse("$toptip.overall.username tipped (toptip.overall.amount) $toptip.overall.currency", &ann())
        .await;
    assert_eq!(out, "ann tipped 6.00 EUR");
}

#[tokio::test]
async fn stream_top_tip_needs_live_stream() {
    let mut world = World::new();
    world.add_event(event("tip", "ann", 1, json!({"amount": 6})));
    let (world, engine) = build(world, Settings::default());

    assert_eq!(engine.parse("Top: $toptip.stream.username", &ann()).await, "");

    let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    world.set_online(true, Some(since)).await;
    assert_eq!(engine.parse("Top: $toptip.stream.username", &ann()).await, "Top: ann");
}

#[tokio::test]
async fn game_and_status_tokens() {
    let mut world = World::new();
    world.stats_mut().game = Some("Chess".into());
    let (_, engine) = build(world, Settings::default());
    assert_eq!(engine.parse("(game) - (status)", &ann()).await, "Chess - n/a");
}

// ── Random pass ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn true_or_false_is_balanced() {
    let (_, engine) = empty();
    let mut heads = 0;
    for _ in 0..1000 {
        match engine.parse("(random.true-or-false)", &ann()).await.as_str() {
            "true" => heads += 1,
            "false" => {}
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!((400..=600).contains(&heads), "heads = {heads}");
}

#[tokio::test]
async fn random_number_bounds() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("(random.number-1-to-1)", &ann()).await, "1");
    for template in ["(random.number-3-to-9)", "(random.number-9-to-3)"] {
        for _ in 0..200 {
            let n: i64 = engine.parse(template, &ann()).await.parse().unwrap();
            assert!((3..=9).contains(&n), "{template} gave {n}");
        }
    }
}

#[tokio::test]
async fn random_number_bounds_from_argument() {
    let (_, engine) = empty();
    let ctx = ann().with_param("7 7");
    assert_eq!(engine.parse("(random.number-min-to-max)", &ctx).await, "7");
    assert_eq!(engine.parse("Rolled (random.number-1-to-max)", &ann()).await, "Rolled 0");
}

#[tokio::test]
async fn random_user_skips_bot_and_broadcaster() {
    let mut world = World::new();
    world.add_user(user("1", "ann", true, false, false));
    world.add_user(user("2", "bot", true, false, false));
    world.add_user(user("3", "caster", true, false, false));
    world.add_user(user("4", "bob", false, true, false));
    let settings = Settings {
        bot_username: "bot".into(),
        broadcaster_username: "Caster".into(),
        ..Settings::default()
    };
    let (_, engine) = build(world, settings);

    for _ in 0..20 {
        assert_eq!(engine.parse("(random.online.viewer)", &ann()).await, "ann");
    }
    assert_eq!(engine.parse("(random.follower)", &ann()).await, "bob");
    assert_eq!(engine.parse("(random.subscriber)", &ann()).await, "unknown");
}

// ── If pass ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn if_branches() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("(if 1==1|yes|no)", &ann()).await, "yes");
    assert_eq!(engine.parse("(if 1==2|yes|no)", &ann()).await, "no");
    assert_eq!(engine.parse("(if 1==2|yes)", &ann()).await, "");
}

#[tokio::test]
async fn if_sees_the_argument() {
    let (_, engine) = empty();
    let ctx = ann().with_param("5");
    assert_eq!(engine.parse("(if $param>3|big|small) one", &ctx).await, "big one");
    assert_eq!(engine.parse("(if >3|big|small)", &ctx).await, "small");
}

// ── Custom variables ──────────────────────────────────────────────────────────

#[tokio::test]
async fn set_then_read_variable() {
    let (world, engine) = empty();
    assert_eq!(engine.parse("$_myvar", &ann().with_param("5")).await, "5");
    assert_eq!(engine.parse("$_myvar", &ann()).await, "5");

    let sent = world.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "$_myvar was set to 5.");
}

#[tokio::test]
async fn quiet_and_silent_variables() {
    let (world, engine) = empty();
    assert_eq!(engine.parse("Now $!_count", &ann().with_param("3")).await, "Now 3");
    assert_eq!(engine.parse("$!!_count done", &ann().with_param("4")).await, "");
    assert!(world.sent().await.is_empty());
    assert_eq!(world.variable("$_count").await.map(|v| v.value), Some("4".into()));
}

#[tokio::test]
async fn custom_response_replaces_message() {
    let mut world = World::new();
    world.set_variable(
        "$_mood",
        Variable {
            value: "calm".into(),
            response_type: ResponseType::Custom,
            response_text: "Mood is now $value".into(),
            is_eval: false,
        },
    );
    world.set_variable(
        "$_score",
        Variable {
            value: "1".into(),
            response_type: ResponseType::Command,
            ..Variable::default()
        },
    );
    let (world, engine) = build(world, Settings::default());

    let ctx = ann().with_param("happy").quiet(true);
    assert_eq!(engine.parse("Mood: $_mood", &ctx).await, "");
    assert_eq!(engine.parse("Score: $_score", &ann().with_param("9")).await, "Score: 9");

    let sent = world.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "Mood is now happy");
    assert!(sent[0].quiet);
}

// ── Eval pass ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn eval_script_uses_scope() {
    let (_, engine) = empty();
    let ctx = ann().with_param("world");
    assert_eq!(engine.parse("(eval return 'hello ' + param)", &ctx).await, "hello world");
    assert_eq!(engine.parse("(eval return sender)", &ann()).await, "@ann");
}

#[tokio::test]
async fn eval_fetches_urls() {
    let mut world = World::new();
    world.route("https://example.test/count", 200, r#"{"n": 3}"#);
    let (world, engine) = build(world, Settings::default());
    let out = engine
        .parse(r#"(eval return url("https://example.test/count").n)"#, &ann())
        .await;
    assert_eq!(out, "3");
    assert_eq!(world.fetched().await, ["https://example.test/count"]);
}

#[tokio::test]
async fn failing_eval_silences_message() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("Result: (eval return nosuchthing)", &ann()).await, "");
}

// ── Param pass and attributes ─────────────────────────────────────────────────

#[tokio::test]
async fn param_defaults() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("$param", &ann()).await, "");
    assert_eq!(engine.parse("$!param", &ann()).await, "n/a");
    assert_eq!(engine.parse("Hi $!param", &ann().with_param("bob")).await, "Hi bob");
}

#[tokio::test]
async fn touser_mentions_target_or_sender() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("hugs $touser", &ann().with_param("@bob")).await, "hugs @bob");
    assert_eq!(engine.parse("hugs $touser", &ann()).await, "hugs @ann");

    let plain = Settings {
        show_with_at: false,
        ..Settings::default()
    };
    let (_, engine) = build(World::new(), plain);
    assert_eq!(engine.parse("hugs $touser", &ann()).await, "hugs ann");
}

#[tokio::test]
async fn attributes_are_substituted() {
    let (_, engine) = empty();
    let ctx = ann().with_cmd("!hi").with_attribute("target", "bob");
    assert_eq!(engine.parse("$sender used $cmd on $target", &ctx).await, "@ann used !hi on bob");
}

// ── Math pass ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn math_expressions() {
    let mut world = World::new();
    world.set_variable(
        "$_a",
        Variable {
            value: "10".into(),
            ..Variable::default()
        },
    );
    let (_, engine) = build(world, Settings::default());
    assert_eq!(engine.parse("(math.2+3*4)", &ann()).await, "14");
    assert_eq!(engine.parse("(math.7/2)", &ann()).await, "3.5");
    assert_eq!(engine.parse("(math.$_a*2) points", &ann()).await, "20 points");
    assert_eq!(engine.parse("(math.5/0)", &ann()).await, "");
}

// ── Online gate ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn online_gates() {
    let (world, engine) = empty();
    assert_eq!(engine.parse("(onlineonly) We are live!", &ann()).await, "");
    assert_eq!(engine.parse("(offlineonly) Back soon", &ann()).await, "Back soon");
    world.set_online(true, None).await;
    assert_eq!(engine.parse("(onlineonly) We are live!", &ann()).await, "We are live!");
    assert_eq!(engine.parse("(offlineonly) Back soon", &ann()).await, "");
}

// ── Command pass ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn command_counters() {
    let mut world = World::new();
    world.set_usage("!hug", 3);
    let (_, engine) = build(world, Settings::default());
    assert_eq!(engine.parse("Hugged $count('!hug') times", &ann()).await, "Hugged 3 times");
    assert_eq!(engine.parse("Used $count times", &ann().with_cmd("!hug")).await, "Used 3 times");
    assert_eq!(engine.parse("Used $count times", &ann()).await, "Used 0 times");
}

#[tokio::test]
async fn embedded_commands_are_dispatched() {
    let (world, engine) = empty();
    let ctx = ann().with_param("bob");
    assert_eq!(engine.parse("Hugs! (!!hug $param)", &ctx).await, "Hugs!");
    assert_eq!(engine.parse("(!so $sender)", &ann()).await, "");

    let dispatched = world.dispatched().await;
    assert_eq!(dispatched.len(), 2);
    assert_eq!(dispatched[0].text, "!hug bob");
    assert_eq!(dispatched[0].opts, DispatchOptions { skip: true, quiet: true });
    assert_eq!(dispatched[1].text, "!so @ann");
    assert_eq!(dispatched[1].opts, DispatchOptions { skip: true, quiet: false });
}

struct FailingDispatcher;

#[async_trait]
impl CommandDispatcher for FailingDispatcher {
    async fn dispatch(&self, _: &Sender, _: &str, _: DispatchOptions) -> chatmsg::Result<()> {
        Err(chatmsg::Error::Service("dispatcher offline".into()))
    }
}

#[tokio::test]
async fn failed_command_still_removes_token() {
    let world = Arc::new(World::new());
    let mut services = world.services();
    services.dispatcher = Arc::new(FailingDispatcher);
    let engine = Engine::new(services, Settings::default()).unwrap();
    assert_eq!(engine.parse("hello (!top) there", &ann()).await, "hello  there");
    assert_eq!(engine.parse("(!!top)", &ann()).await, "");
}

// ── Query string pass ─────────────────────────────────────────────────────────

#[tokio::test]
async fn query_string_and_url() {
    let (_, engine) = empty();
    let ctx = ann().with_param("a b&c");
    assert_eq!(
        engine.parse("https://example.test/?q=$querystring", &ctx).await,
        "https://example.test/?q=a%20b%26c"
    );
    assert_eq!(engine.parse("(url|a b/c?d=1)", &ann()).await, "a%20b/c?d=1");
}

// ── List pass ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_list_keeps_message() {
    let (_, engine) = empty();
    assert_eq!(engine.parse("Aliases: (list.alias) end", &ann()).await, "Aliases:   end");
}

#[tokio::test]
async fn lists_of_registry_entries() {
    let mut world = World::new();
    world.add_alias(AliasEntry {
        alias: "!hi".into(),
        visible: true,
        enabled: true,
    });
    world.add_alias(AliasEntry {
        alias: "!secret".into(),
        visible: false,
        enabled: true,
    });
    world.add_command(CommandEntry {
        command: "!mods".into(),
        visible: true,
        enabled: true,
        permissions: vec!["moderators".into()],
    });
    world.add_command(CommandEntry {
        command: "!all".into(),
        visible: true,
        enabled: true,
        permissions: vec!["viewers".into()],
    });
    world.add_cooldown(CooldownEntry {
        name: "!hug".into(),
        millis: 1500,
        enabled: true,
    });
    world.add_rank(RankEntry {
        rank: "Regular".into(),
        hours: 10,
    });
    world.add_rank(RankEntry {
        rank: "Newbie".into(),
        hours: 1,
    });
    let (_, engine) = build(world, Settings::default());

    assert_eq!(engine.parse("(list.alias)", &ann()).await, "hi");
    assert_eq!(engine.parse("(list.!alias)", &ann()).await, "!hi");
    assert_eq!(engine.parse("(list.command)", &ann()).await, "all, mods");
    assert_eq!(engine.parse("(list.!command.moderators)", &ann()).await, "!mods");
    assert_eq!(engine.parse("x (list.command.nobody)", &ann()).await, "x");
    assert_eq!(engine.parse("(list.cooldown)", &ann()).await, "!hug: 1.5s");
    assert_eq!(engine.parse("(list.ranks)", &ann()).await, "Newbie (1h), Regular (10h)");
    assert_eq!(engine.parse("Oops (list.nothing)", &ann()).await, "");
}

// ── Stream pass ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_lookup_without_credentials_falls_back() {
    let (_, engine) = empty();
    assert_eq!(
        engine.parse("(stream|chesspro|game) with (stream|chesspro|viewers)", &ann()).await,
        "n/a with 0"
    );
}

#[tokio::test]
async fn stream_lookup_through_helix() {
    let mut world = World::new();
    world.set_credentials(Credentials {
        access_token: "token".into(),
        client_id: "client".into(),
    });
    world.route(
        "https://api.twitch.tv/helix/users?login=chesspro",
        200,
        r#"{"data":[{"id":"77"}]}"#,
    );
    world.route(
        "https://api.twitch.tv/helix/streams?user_id=77",
        200,
        r#"{"data":[{"title":"Blitz","viewer_count":120,"game_id":"9"}]}"#,
    );
    world.route("https://api.twitch.tv/helix/games?id=9", 200, r#"{"data":[{"name":"Chess"}]}"#);
    let (_, engine) = build(world, Settings::default());

    let out = engine
        .parse("(stream|chesspro|game): (stream|chesspro|title) for (stream|chesspro|viewers)", &ann())
        .await;
    assert_eq!(out, "Chess: Blitz for 120");
}

// ── Api stage ─────────────────────────────────────────────────────────────────

fn api_world() -> World {
    let mut world = World::new();
    world.route("https://example/ok", 200, r#"{"a":1,"b":{"c":["x","y"]}}"#);
    world.route("https://example/text", 200, r#""just text""#);
    world.route("https://example/down", 503, "");
    world
}

#[tokio::test]
async fn api_whole_response() {
    let mut world = World::new();
    world.route("https://example/ok", 200, r#"{"a":1}"#);
    let (_, engine) = build(world, Settings::default());
    assert_eq!(engine.parse("(api|https://example/ok)(api._response)", &ann()).await, r#"{"a":1}"#);
    assert_eq!(engine.parse("(api|https://example/ok)(api.a)", &ann()).await, "1");
}

#[tokio::test]
async fn api_accessors_and_errors() {
    let (_, engine) = build(api_world(), Settings::default());
    assert_eq!(
        engine.parse("(api|https://example/ok)(api.b.c[1]) and (api.zzz)", &ann()).await,
        "y and not available"
    );
    assert_eq!(engine.parse("(api|https://example/text)Said: (api._response)", &ann()).await, "Said: just text");
    assert_eq!(engine.parse("(api|https://example/down)(api.a)", &ann()).await, "API error");
    assert_eq!(engine.parse("(api|https://example/missing)(api.a)", &ann()).await, "API error");
}

// ── Overlay ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn overlay_marks_unset_variables() {
    let mut world = World::new();
    world.set_variable(
        "$_goal",
        Variable {
            value: "100".into(),
            ..Variable::default()
        },
    );
    world.stats_mut().followers = 12;
    let (_, engine) = build(world, Settings::default());
    let out = overlay::render(&engine, "$followers / $_goal ($_missing)").await.unwrap();
    assert_eq!(out, "12 / 100 (<strong>$_missing</strong>)");
}

// ── Config-driven world ───────────────────────────────────────────────────────

#[tokio::test]
async fn world_from_config_file() {
    let src = "\
; demo world
/set show_with_at=off
/set stats.viewers=7
/set stats.game=Chess
/adduser -of ann 1
/addusage !hug 2
/set $_goal=50
";
    let (config, errors) = Config::load_str(src);
    assert!(errors.is_empty(), "{errors:?}");
    let settings = Settings::from_vars(&config.vars);
    let (_, engine) = build(config.world, settings);

    let out = engine
        .parse("$sender: $viewers on $game, goal $_goal, $count('!hug') hugs", &ann())
        .await;
    assert_eq!(out, "ann: 7 on Chess, goal 50, 2 hugs");
}
