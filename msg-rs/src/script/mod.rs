//! Sandboxed scripting used by `(eval ...)`, `(if ...)` and `(math. ...)`.
//!
//! A small tree-walking interpreter covering:
//!
//! - JavaScript-like expressions: arithmetic, comparison, `&&`/`||`,
//!   ternaries, member access, indexing and method calls
//! - `let`/`const`/`var`, `return` and `if`/`else` statements
//! - arrow callbacks for list methods (`map`, `filter`, `find`, ...)
//! - a math dialect where `^` is exponentiation
//!
//! # Quick start
//!
//! ```rust
//! use chatmsg::script::{Sandbox, Scope};
//! use chatmsg::services::ExpressionEvaluator;
//!
//! let mut scope = Scope::new();
//! scope.insert("param", "6");
//! let v = Sandbox.evaluate_sandboxed("return param * 7", scope).unwrap();
//! assert_eq!(v.to_string(), "42");
//! ```

pub mod builtins;
pub mod expr;
pub mod sandbox;
pub mod value;

// Re-exports for convenience.
pub use expr::{Dialect, EvalContext};
pub use sandbox::{Sandbox, Scope};
pub use value::Value;
