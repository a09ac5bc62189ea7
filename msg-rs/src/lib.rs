//! Chat bot message templating.
//!
//! A chat line such as `"Hi $touser, $game is on! (if $param|...)"` is
//! rewritten by a fixed pipeline of substitution passes (see
//! [`message::Pipeline`]).  Every lookup the passes make goes through the
//! collaborator traits in [`services`]; [`memory::World`] implements them in
//! memory for the command-line tool and the tests.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod grammar;
pub mod http;
pub mod memory;
pub mod message;
pub mod overlay;
pub mod script;
pub mod services;
pub mod var;

pub use error::{Error, Result};
pub use message::{Context, Engine, GlobalOptions, Message};
