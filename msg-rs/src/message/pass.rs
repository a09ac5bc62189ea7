//! Pass tables and the generic pass runner.
//!
//! A [`Pipeline`] is the fixed, ordered list of [`Stage`]s a message goes
//! through.  Most stages are a [`Pass`]: an ordered table of [`Rule`]s, each
//! pairing a compiled [`TokenPattern`] with the [`Token`] that resolves it,
//! plus the [`Policy`] applied when a token resolves to nothing.

use tracing::{debug, warn};

use super::custom::VarMode;
use super::online::Gate;
use super::random::Pool;
use super::stream::StreamField;
use super::{Context, Message};
use crate::error::GrammarError;
use crate::grammar::{TokenPattern, Wildcard};

// ── Tokens ───────────────────────────────────────────────────────────────────

/// What a matched token resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Price,
    TopTip,
    Game,
    Status,
    RandomUser { online: bool, pool: Pool },
    RandomNumber,
    TrueOrFalse,
    If,
    Variable(VarMode),
    Eval,
    ToUser,
    Param,
    ParamOrNa,
    Math,
    Online(Gate),
    CountOf,
    Count,
    Dispatch { quiet: bool },
    QueryString,
    Url,
    List,
    Stream(StreamField),
}

/// What happens to the buffer when a token resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// An empty result clears the whole message.
    ClearWhenEmpty,
    /// An empty result removes just the token; no result leaves it in place.
    KeepWhenEmpty,
    /// The token is a predicate: false clears the message, true strips the token.
    Gate,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: TokenPattern,
    pub token: Token,
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub name: &'static str,
    pub policy: Policy,
    pub rules: Vec<Rule>,
}

impl Pass {
    /// Table whose wildcards follow the key prefix (`$` keys capture a word).
    pub fn generic(name: &'static str, policy: Policy, rules: &[(&str, Token)]) -> Result<Self, GrammarError> {
        Self::build(name, policy, rules, Wildcard::for_key)
    }

    /// Table where every key uses the same wildcard mode.
    pub fn with_wildcard(
        name: &'static str,
        policy: Policy,
        wildcard: Wildcard,
        rules: &[(&str, Token)],
    ) -> Result<Self, GrammarError> {
        Self::build(name, policy, rules, |_| wildcard)
    }

    fn build(
        name: &'static str,
        policy: Policy,
        rules: &[(&str, Token)],
        mode: impl Fn(&str) -> Wildcard,
    ) -> Result<Self, GrammarError> {
        let rules = rules
            .iter()
            .map(|&(template, token)| {
                Ok(Rule {
                    pattern: TokenPattern::new(template, mode(template))?,
                    token,
                })
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;
        Ok(Self { name, policy, rules })
    }
}

/// One step of the pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Literal stream/channel placeholders.
    Global,
    Pass(Pass),
    /// `$key` replacement from the context's attributes.
    Attributes,
    /// `(api|url)` with its `(api.path)` accessors.
    Api,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// The fixed message pipeline.
    pub fn standard() -> Result<Self, GrammarError> {
        use Policy::{ClearWhenEmpty, KeepWhenEmpty};
        use Token::*;

        let price = Pass::generic("price", ClearWhenEmpty, &[("(price)", Price)])?;

        let info = Pass::generic(
            "info",
            ClearWhenEmpty,
            &[
                ("$toptip.#.#", TopTip),
                ("(toptip.#.#)", TopTip),
                ("(game)", Game),
                ("(status)", Status),
            ],
        )?;

        let random = Pass::generic(
            "random",
            ClearWhenEmpty,
            &[
                ("(random.online.viewer)", RandomUser { online: true, pool: Pool::Viewer }),
                ("(random.online.follower)", RandomUser { online: true, pool: Pool::Follower }),
                ("(random.online.subscriber)", RandomUser { online: true, pool: Pool::Subscriber }),
                ("(random.viewer)", RandomUser { online: false, pool: Pool::Viewer }),
                ("(random.follower)", RandomUser { online: false, pool: Pool::Follower }),
                ("(random.subscriber)", RandomUser { online: false, pool: Pool::Subscriber }),
                ("(random.number-#-to-#)", RandomNumber),
                ("(random.true-or-false)", TrueOrFalse),
            ],
        )?;

        let cond = Pass::generic("if", KeepWhenEmpty, &[("(if#)", If)])?;

        let custom = Pass::with_wildcard(
            "custom",
            ClearWhenEmpty,
            Wildcard::Name,
            &[
                ("$_#", Variable(VarMode::Normal)),
                ("$!_#", Variable(VarMode::Quiet)),
                ("$!!_#", Variable(VarMode::Silent)),
            ],
        )?;

        let eval = Pass::with_wildcard("eval", ClearWhenEmpty, Wildcard::Greedy, &[("(eval#)", Eval)])?;

        let param = Pass::generic(
            "param",
            ClearWhenEmpty,
            &[("$touser", ToUser), ("$param", Param), ("$!param", ParamOrNa)],
        )?;

        let math = Pass::generic("math", ClearWhenEmpty, &[("(math.#)", Math)])?;

        let online = Pass::with_wildcard(
            "online",
            Policy::Gate,
            Wildcard::Gate,
            &[("(onlineonly)", Online(Gate::Online)), ("(offlineonly)", Online(Gate::Offline))],
        )?;

        let command = Pass::with_wildcard(
            "command",
            KeepWhenEmpty,
            Wildcard::Any,
            &[
                ("$count('#')", CountOf),
                ("$count", Count),
                ("(!!#)", Dispatch { quiet: true }),
                ("(!#)", Dispatch { quiet: false }),
            ],
        )?;

        let qs = Pass::generic("qs", KeepWhenEmpty, &[("$querystring", QueryString), ("(url|#)", Url)])?;

        let list = Pass::generic("list", ClearWhenEmpty, &[("(list.#)", List)])?;

        let stream = Pass::generic(
            "stream",
            ClearWhenEmpty,
            &[
                ("(stream|#|game)", Stream(StreamField::Game)),
                ("(stream|#|title)", Stream(StreamField::Title)),
                ("(stream|#|viewers)", Stream(StreamField::Viewers)),
            ],
        )?;

        Ok(Self {
            stages: vec![
                Stage::Global,
                Stage::Pass(price),
                Stage::Pass(info),
                Stage::Pass(random),
                Stage::Pass(cond),
                Stage::Pass(custom),
                Stage::Pass(eval),
                Stage::Pass(param),
                Stage::Attributes,
                Stage::Pass(math),
                Stage::Pass(online),
                Stage::Pass(command),
                Stage::Pass(qs),
                Stage::Pass(list),
                Stage::Pass(stream),
                Stage::Api,
            ],
        })
    }

    /// Pass by name, for inspection.
    pub fn pass(&self, name: &str) -> Option<&Pass> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Pass(pass) if pass.name == name => Some(pass),
            _ => None,
        })
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

impl Message<'_> {
    /// Apply one pass table to the buffer.
    ///
    /// Every match of every rule is collected up front and resolved left to
    /// right; each result replaces the first remaining occurrence of its
    /// matched text.  A cleared buffer stays cleared, but the remaining
    /// resolvers of the pass still run.
    pub(super) async fn run_pass(&mut self, pass: &Pass, ctx: &Context) {
        if self.is_blank() {
            return;
        }
        for rule in &pass.rules {
            for matched in rule.pattern.find_all(&self.text) {
                if pass.policy == Policy::Gate {
                    let open = match self.gate(rule.token).await {
                        Ok(open) => open,
                        Err(e) => {
                            warn!(pass = pass.name, token = %matched, error = %e, "gate check failed");
                            false
                        }
                    };
                    debug!(pass = pass.name, token = %matched, open, "gate");
                    if open {
                        self.splice(&matched, "");
                    } else {
                        self.text.clear();
                    }
                    continue;
                }

                let result = match self.resolve(rule.token, &matched, ctx).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(pass = pass.name, token = %matched, error = %e, "token resolver failed");
                        None
                    }
                };
                match (pass.policy, result) {
                    (Policy::KeepWhenEmpty, None) => {}
                    (Policy::KeepWhenEmpty, Some(value)) => self.splice(&matched, &value),
                    (_, result) => {
                        let value = result.unwrap_or_default();
                        if value.is_empty() {
                            self.text.clear();
                        }
                        self.splice(&matched, &value);
                    }
                }
            }
        }
    }

    /// Replace the first occurrence of `matched` and trim the buffer.
    pub(super) fn splice(&mut self, matched: &str, value: &str) {
        let replaced = self.text.replacen(matched, value, 1);
        self.text = replaced.trim().to_owned();
    }

    pub(super) fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
