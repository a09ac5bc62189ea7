//! Error types shared by the engine and its collaborators.

use thiserror::Error;

/// Failure to compile a token template into a regular expression.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("invalid token template '{template}': {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Error reported by the expression interpreter.
///
/// The interpreter itself works with plain `String` messages; this wraps
/// them at the evaluator boundary.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ScriptError(pub String);

impl From<String> for ScriptError {
    fn from(msg: String) -> Self {
        ScriptError(msg)
    }
}

/// Top-level error for resolvers and collaborator calls.
///
/// Resolver errors never reach the caller of `Message::parse`; the pass
/// runner logs them and treats the token as resolving to nothing.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    #[error("http error: {0}")]
    Http(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
