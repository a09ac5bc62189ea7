//! The sandbox: scopes and the evaluator implementations the engine calls.
//!
//! A script sees exactly the bindings placed in its [`Scope`] plus the pure
//! built-ins of [`super::builtins`]; there is no I/O, no looping construct
//! and no way to reach host state.

use std::collections::HashMap;

use super::builtins;
use super::expr::{self, Dialect, EvalContext};
use super::value::Value;
use crate::error::ScriptError;
use crate::services::{ArithmeticEvaluator, ExpressionEvaluator};

/// Variable bindings visible to one script run.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope pre-populated with the constants of `dialect`.
    pub fn for_dialect(dialect: Dialect) -> Self {
        let mut scope = Self::new();
        let consts: &[(&str, f64)] = match dialect {
            Dialect::Script => &[
                ("Math.PI", std::f64::consts::PI),
                ("Math.E", std::f64::consts::E),
                ("Infinity", f64::INFINITY),
                ("NaN", f64::NAN),
            ],
            Dialect::Math => &[
                ("pi", std::f64::consts::PI),
                ("e", std::f64::consts::E),
                ("tau", std::f64::consts::TAU),
                ("phi", 1.618_033_988_749_895),
                ("Infinity", f64::INFINITY),
            ],
        };
        for &(name, x) in consts {
            scope.insert(name, Value::Float(x));
        }
        scope
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Merge `other` into `self`; `other` wins on conflicts.
    pub fn extend(&mut self, other: Scope) {
        self.vars.extend(other.vars);
    }
}

impl EvalContext for Scope {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn set_local(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_owned(), value);
    }

    fn unset_local(&mut self, name: &str) {
        self.vars.remove(name);
    }

    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Result<Value, String> {
        builtins::call_builtin(name, args).unwrap_or_else(|| Err(format!("{name} is not defined")))
    }
}

/// The restricted interpreter behind both evaluator traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sandbox;

impl ExpressionEvaluator for Sandbox {
    fn evaluate_boolean(&self, expr: &str) -> Result<bool, ScriptError> {
        let mut scope = Scope::for_dialect(Dialect::Script);
        let v = expr::eval_str(expr, Dialect::Script, &mut scope)?;
        Ok(v.as_bool())
    }

    fn evaluate_sandboxed(&self, script: &str, scope: Scope) -> Result<Value, ScriptError> {
        let program = expr::parse_program(script)?;
        let mut full = Scope::for_dialect(Dialect::Script);
        full.extend(scope);
        Ok(expr::run_program(&program, &mut full)?)
    }
}

impl ArithmeticEvaluator for Sandbox {
    fn evaluate(&self, src: &str) -> Result<f64, ScriptError> {
        let mut scope = Scope::for_dialect(Dialect::Math);
        let v = expr::eval_str(src, Dialect::Math, &mut scope)?;
        match v {
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(v.as_float()),
            other => Err(ScriptError(format!("'{other}' is not a number"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_int_arithmetic_does_not_overflow() {
        assert_eq!(Sandbox.evaluate("-(-9223372036854775807 - 1)"), Ok(9_223_372_036_854_775_808.0));
        assert_eq!(Sandbox.evaluate_boolean("-(-9223372036854775807 - 1) > 0"), Ok(true));
        assert!(Sandbox.evaluate_boolean("'ab'.repeat(9223372036854775807)").is_err());
    }

    #[test]
    fn boolean_conditions() {
        assert_eq!(Sandbox.evaluate_boolean("1==1"), Ok(true));
        assert_eq!(Sandbox.evaluate_boolean("1==2"), Ok(false));
        assert_eq!(Sandbox.evaluate_boolean("'abc'"), Ok(true));
        assert!(Sandbox.evaluate_boolean("days > 2").is_err());
    }

    #[test]
    fn sandboxed_script_sees_only_its_scope() {
        let mut scope = Scope::new();
        scope.insert("param", "world");
        let v = Sandbox.evaluate_sandboxed("return 'hello ' + param", scope).unwrap();
        assert_eq!(v, Value::from("hello world"));
        assert!(Sandbox.evaluate_sandboxed("return param", Scope::new()).is_err());
    }

    #[test]
    fn script_without_return_is_null() {
        assert_eq!(Sandbox.evaluate_sandboxed("let x = 1", Scope::new()), Ok(Value::Null));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Sandbox.evaluate("1 + 2 * 3"), Ok(7.0));
        assert_eq!(Sandbox.evaluate("2^10"), Ok(1024.0));
        assert_eq!(Sandbox.evaluate("sqrt(16) + round(pi)"), Ok(7.0));
        assert!(Sandbox.evaluate("'a' + 1").is_err());
        assert!(Sandbox.evaluate("5 / 0").is_err());
    }
}
