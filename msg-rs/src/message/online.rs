//! `(onlineonly)` and `(offlineonly)` message gates.

use super::Engine;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Online,
    Offline,
}

/// Whether a message carrying `gate` may be sent right now.
pub(super) async fn is_open(engine: &Engine, gate: Gate) -> Result<bool> {
    let online = engine.services.broadcast.snapshot().await?.online;
    Ok(match gate {
        Gate::Online => online,
        Gate::Offline => !online,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::World;
    use crate::message::Context;
    use crate::var::Settings;

    #[tokio::test]
    async fn gate_follows_stream_state() {
        let world = Arc::new(World::new());
        let engine = Engine::new(world.services(), Settings::default()).unwrap();
        assert!(!is_open(&engine, Gate::Online).await.unwrap());
        assert!(is_open(&engine, Gate::Offline).await.unwrap());

        world.set_online(true, None).await;
        assert!(is_open(&engine, Gate::Online).await.unwrap());
        assert!(!is_open(&engine, Gate::Offline).await.unwrap());
    }

    #[tokio::test]
    async fn lone_gate_renders_empty_either_way() {
        let world = Arc::new(World::new());
        let engine = Engine::new(world.services(), Settings::default()).unwrap();
        let ctx = Context::default();
        assert_eq!(engine.parse("(onlineonly)", &ctx).await, "");
        world.set_online(true, None).await;
        assert_eq!(engine.parse("(onlineonly)", &ctx).await, "");
        assert_eq!(engine.parse("(onlineonly) live now", &ctx).await, "live now");
        assert_eq!(engine.parse("(offlineonly) live now", &ctx).await, "");
    }
}
