//! Token grammar: compiles token templates into regular expressions.
//!
//! A template is literal text with zero or more `#` wildcards, e.g.
//! `(random.number-#-to-#)` or `$_#`.  Literal text is escaped; each `#`
//! becomes one capture group whose shape is chosen by the [`Wildcard`] mode.
//!
//! ## Wildcard modes
//!
//! | Mode | Expansion | Used by |
//! |------|-----------|---------|
//! | [`Wildcard::Word`]   | `(\b.+?\b)`        | `$`-prefixed keys |
//! | [`Wildcard::Lazy`]   | `([\S ]+?)`        | parenthesised keys |
//! | [`Wildcard::Gate`]   | `(\S+)`            | online-gate tables |
//! | [`Wildcard::Name`]   | `([a-zA-Z0-9_]+)`  | variable-name tables |
//! | [`Wildcard::Greedy`] | `([\S ]+)`         | eval tables |
//! | [`Wildcard::Any`]    | `(.*?)`            | command tables |

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::GrammarError;

// ── Public types ─────────────────────────────────────────────────────────────

/// How a `#` wildcard is rendered into the compiled regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    Word,
    Lazy,
    Gate,
    Name,
    Greedy,
    Any,
}

impl Wildcard {
    /// The capture group a `#` expands to.
    pub fn group(self) -> &'static str {
        match self {
            Wildcard::Word => r"(\b.+?\b)",
            Wildcard::Lazy => r"([\S ]+?)",
            Wildcard::Gate => r"(\S+)",
            Wildcard::Name => r"([a-zA-Z0-9_]+)",
            Wildcard::Greedy => r"([\S ]+)",
            Wildcard::Any => r"(.*?)",
        }
    }

    /// Mode for a key in a generic substitution table: `$`-prefixed keys
    /// capture a word, everything else captures lazily including spaces.
    pub fn for_key(template: &str) -> Self {
        if template.starts_with('$') {
            Wildcard::Word
        } else {
            Wildcard::Lazy
        }
    }
}

/// A compiled token template.
///
/// `Arc` makes `Clone` a reference-count increment instead of a recompile.
#[derive(Clone)]
pub struct TokenPattern {
    template: String,
    wildcard: Wildcard,
    regex: Arc<Regex>,
}

impl std::fmt::Debug for TokenPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPattern")
            .field("template", &self.template)
            .field("wildcard", &self.wildcard)
            .finish()
    }
}

impl TokenPattern {
    /// Compile `template` with `wildcard` expansion.
    pub fn new(template: &str, wildcard: Wildcard) -> Result<Self, GrammarError> {
        Ok(Self {
            template: template.to_owned(),
            wildcard,
            regex: Arc::new(compile(template, wildcard)?),
        })
    }

    /// The source template.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn wildcard(&self) -> Wildcard {
        self.wildcard
    }

    /// Every non-overlapping match in `text`, left to right.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        self.regex
            .find_iter(text)
            .map(|m| m.as_str().to_owned())
            .collect()
    }

    /// Returns `true` if the template occurs anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

// ── Compilation ───────────────────────────────────────────────────────────────

/// Render `template` into regex source: literal runs escaped, each `#`
/// replaced by the wildcard's capture group.
pub fn render(template: &str, wildcard: Wildcard) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    for (i, literal) in template.split('#').enumerate() {
        if i > 0 {
            out.push_str(wildcard.group());
        }
        out.push_str(&regex::escape(literal));
    }
    out
}

/// Compile `template` into a [`Regex`].
pub fn compile(template: &str, wildcard: Wildcard) -> Result<Regex, GrammarError> {
    Regex::new(&render(template, wildcard)).map_err(|source| GrammarError::InvalidTemplate {
        template: template.to_owned(),
        source,
    })
}

/// Compile a fixed regex once and keep it in `cell`.
pub fn fixed(cell: &'static OnceLock<Regex>, src: &str) -> Result<&'static Regex, GrammarError> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(src).map_err(|source| GrammarError::InvalidTemplate {
        template: src.to_owned(),
        source,
    })?;
    Ok(cell.get_or_init(|| re))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
