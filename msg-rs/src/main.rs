//! `chatmsg` command-line tool: render a message against a world file and
//! report the side effects it produced.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use chatmsg::cli::{self, CliArgs, ConfigFile};
use chatmsg::config::Config;
use chatmsg::http::ReqwestFetcher;
use chatmsg::memory::World;
use chatmsg::services::Sender;
use chatmsg::var::Settings;
use chatmsg::{overlay, Context, Engine, GlobalOptions};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("chatmsg: {e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };
    if args.help {
        println!("{}", cli::USAGE);
        return;
    }

    let level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("chatmsg: {e}");
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    // ── Load the world ────────────────────────────────────────────────────────
    let path = match &args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(p) => Some(p.clone()),
        ConfigFile::Search => cli::find_user_config(),
    };
    let config = match path {
        Some(p) => {
            debug!(path = %p.display(), "loading world");
            let (config, errors) = Config::load_file(&p)?;
            for e in errors {
                warn!("{}: {e}", p.display());
            }
            config
        }
        None => Config::new(),
    };

    let settings = Settings::from_vars(&config.vars);
    let world = Arc::new(config.world);
    let mut services = world.services();
    if args.live_http {
        services.http = Arc::new(ReqwestFetcher::with_timeout(HTTP_TIMEOUT)?);
    }
    let engine = Engine::new(services, settings)?;

    // ── Render ────────────────────────────────────────────────────────────────
    let output = if args.global_only {
        let opts = GlobalOptions { escape: args.escape.clone() };
        engine.global(&args.text, &opts).await
    } else if args.overlay {
        overlay::render(&engine, &args.text).await?
    } else {
        let ctx = context(&args, &engine).await?;
        engine.parse(&args.text, &ctx).await
    };
    println!("{output}");

    // ── Side effects ──────────────────────────────────────────────────────────
    for d in world.dispatched().await {
        eprintln!("dispatched: {} (as {})", d.text, d.sender.username);
    }
    for line in world.sent().await {
        let quiet = if line.quiet { " [quiet]" } else { "" };
        eprintln!("sent: {}{quiet}", line.text);
    }
    Ok(())
}

/// Build the render context; the sender's id is looked up when not given.
async fn context(args: &CliArgs, engine: &Engine) -> chatmsg::Result<Context> {
    let username = args
        .sender
        .clone()
        .unwrap_or_else(|| engine.settings().broadcaster_username.clone());
    let user_id = match &args.user_id {
        Some(id) => id.clone(),
        None => engine
            .services()
            .users
            .by_name(&username)
            .await?
            .map_or_else(|| username.clone(), |u| u.user_id),
    };

    let mut ctx = Context::new(Sender::new(username, user_id)).quiet(args.quiet);
    if let Some(param) = &args.param {
        ctx = ctx.with_param(param.as_str());
    }
    if let Some(cmd) = &args.cmd {
        ctx = ctx.with_cmd(cmd.as_str());
    }
    Ok(ctx)
}
