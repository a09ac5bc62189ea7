//! The message template engine.
//!
//! [`Engine`] holds the collaborators, the settings and the compiled
//! [`Pipeline`]; a [`Message`] is one buffer pushed through it.
//!
//! ```rust,no_run
//! # async fn demo(engine: &chatmsg::message::Engine) {
//! use chatmsg::message::Context;
//! use chatmsg::services::Sender;
//!
//! let ctx = Context::new(Sender::new("ann", "1")).with_param("bob");
//! let text = engine.parse("Hi $touser, from $sender!", &ctx).await;
//! # }
//! ```

mod api;
mod cmd;
mod cond;
mod custom;
mod eval;
mod global;
mod info;
mod list;
mod math;
mod online;
mod params;
mod pass;
mod query;
mod random;
mod stream;

use crate::entity;
use crate::error::{GrammarError, Result};
use crate::services::{Sender, Services};
use crate::var::Settings;

pub use custom::VarMode;
pub use online::Gate;
pub use pass::{Pass, Pipeline, Policy, Rule, Stage, Token};
pub use random::Pool;
pub use stream::StreamField;

// ── Context ──────────────────────────────────────────────────────────────────

/// Who a message is rendered for, and with what arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub sender: Sender,
    /// Raw argument text of the command being answered.
    pub param: Option<String>,
    /// The command being answered, e.g. `!points`.
    pub cmd: Option<String>,
    /// Suppress confirmations sent on behalf of the command.
    pub quiet: bool,
    /// Extra `$key` replacements.
    pub attributes: Vec<(String, String)>,
}

impl Context {
    pub fn new(sender: Sender) -> Self {
        Self {
            sender,
            ..Self::default()
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = Some(cmd.into());
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// The argument, if one was given and is non-empty.
    pub fn arg(&self) -> Option<&str> {
        self.param.as_deref().filter(|p| !p.is_empty())
    }
}

/// Options for [`Message::global`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Backslash-escape this string inside song titles and artists.
    pub escape: Option<String>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct Engine {
    services: Services,
    settings: Settings,
    pipeline: Pipeline,
}

impl Engine {
    pub fn new(services: Services, settings: Settings) -> std::result::Result<Self, GrammarError> {
        Ok(Self {
            services,
            settings,
            pipeline: Pipeline::standard()?,
        })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Start a message from raw, entity-encoded text.
    pub fn message(&self, raw: &str) -> Message<'_> {
        Message::new(self, raw)
    }

    /// Run `raw` through the full pipeline.
    pub async fn parse(&self, raw: &str, ctx: &Context) -> String {
        self.message(raw).parse(ctx).await
    }

    /// Run `raw` through the global placeholders only.
    pub async fn global(&self, raw: &str, opts: &GlobalOptions) -> String {
        self.message(raw).global(opts).await
    }

    fn mention(&self, username: &str) -> String {
        self.settings.mention(username)
    }
}

// ── Message ──────────────────────────────────────────────────────────────────

/// One text buffer on its way through the pipeline.
pub struct Message<'e> {
    engine: &'e Engine,
    text: String,
}

impl<'e> Message<'e> {
    pub fn new(engine: &'e Engine, raw: &str) -> Self {
        Self {
            engine,
            text: entity::decode(raw),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Run every stage in order and return the final text.
    pub async fn parse(mut self, ctx: &Context) -> String {
        let engine = self.engine;
        for stage in &engine.pipeline.stages {
            match stage {
                Stage::Global => {
                    self.global(&GlobalOptions::default()).await;
                }
                Stage::Pass(pass) => self.run_pass(pass, ctx).await,
                Stage::Attributes => self.apply_attributes(ctx),
                Stage::Api => self.run_api().await,
            }
        }
        self.text
    }

    /// Literal `$key` replacement; `sender` renders as a mention.
    fn apply_attributes(&mut self, ctx: &Context) {
        let engine = self.engine;
        let mut pairs = vec![("sender".to_owned(), engine.mention(&ctx.sender.username))];
        if let Some(param) = &ctx.param {
            pairs.push(("param".to_owned(), param.clone()));
        }
        if let Some(cmd) = &ctx.cmd {
            pairs.push(("cmd".to_owned(), cmd.clone()));
        }
        pairs.extend(ctx.attributes.iter().cloned());
        for (key, value) in pairs {
            self.text = self.text.replace(&format!("${key}"), &value);
        }
    }

    async fn resolve(&self, token: Token, matched: &str, ctx: &Context) -> Result<Option<String>> {
        let engine = self.engine;
        match token {
            Token::Price => info::price(engine, ctx).await,
            Token::TopTip => info::top_tip(engine, matched).await,
            Token::Game => info::game(engine).await,
            Token::Status => info::status(engine).await,
            Token::RandomUser { online, pool } => random::user(engine, online, pool).await,
            Token::RandomNumber => Ok(Some(random::number(matched, ctx))),
            Token::TrueOrFalse => Ok(Some(random::true_or_false())),
            Token::If => Ok(Some(cond::resolve(engine, matched, ctx))),
            Token::Variable(mode) => custom::resolve(engine, mode, matched, ctx).await,
            Token::Eval => eval::resolve(engine, matched, ctx).await,
            Token::ToUser => Ok(Some(params::to_user(engine, ctx))),
            Token::Param => Ok(Some(ctx.arg().unwrap_or_default().to_owned())),
            Token::ParamOrNa => Ok(Some(ctx.arg().unwrap_or("n/a").to_owned())),
            Token::Math => math::resolve(engine, matched).await,
            Token::Online(_) => Ok(None),
            Token::CountOf => cmd::count_of(engine, matched).await,
            Token::Count => cmd::count(engine, ctx).await,
            Token::Dispatch { quiet } => cmd::dispatch(engine, matched, ctx, quiet).await,
            Token::QueryString => Ok(Some(query::query_string(ctx))),
            Token::Url => Ok(Some(query::url(matched))),
            Token::List => list::resolve(engine, matched).await,
            Token::Stream(field) => Ok(Some(stream::resolve(engine, matched, field).await)),
        }
    }

    async fn gate(&self, token: Token) -> Result<bool> {
        match token {
            Token::Online(gate) => online::is_open(self.engine, gate).await,
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_arg_ignores_empty_param() {
        let ctx = Context::new(Sender::new("ann", "1"));
        assert_eq!(ctx.arg(), None);
        assert_eq!(ctx.clone().with_param("").arg(), None);
        assert_eq!(ctx.with_param("x y").arg(), Some("x y"));
    }

    #[test]
    fn context_builder_collects_attributes() {
        let ctx = Context::new(Sender::new("ann", "1"))
            .with_cmd("!hi")
            .quiet(true)
            .with_attribute("target", "bob");
        assert_eq!(ctx.cmd.as_deref(), Some("!hi"));
        assert!(ctx.quiet);
        assert_eq!(ctx.attributes, [("target".to_owned(), "bob".to_owned())]);
    }
}
