//! `(list.<system>[.<permission>])`.

use tracing::warn;

use super::Engine;
use crate::error::Result;
use crate::script::value::format_number;

/// List the enabled, visible entries of `system`.  An empty list renders as a
/// single space so it does not silence the message.
pub(super) async fn resolve(engine: &Engine, matched: &str) -> Result<Option<String>> {
    let body = matched
        .strip_prefix("(list.")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or_default();
    let mut parts = body.split('.');
    let system = parts.next().unwrap_or_default();
    let permission = parts.next().filter(|p| !p.is_empty());
    let registry = &engine.services.registry;

    let items: Vec<String> = match system {
        "alias" | "!alias" => {
            let raw = system.starts_with('!');
            let mut names: Vec<String> = registry
                .aliases()
                .await?
                .into_iter()
                .filter(|a| a.visible && a.enabled)
                .map(|a| if raw { a.alias } else { a.alias.replacen('!', "", 1) })
                .collect();
            names.sort();
            names
        }
        "command" | "!command" => {
            let raw = system.starts_with('!');
            let mut commands: Vec<_> = registry
                .commands()
                .await?
                .into_iter()
                .filter(|c| c.visible && c.enabled)
                .collect();
            if let Some(permission) = permission {
                match registry.permission(permission).await? {
                    Some(id) => commands.retain(|c| c.permissions.contains(&id)),
                    None => commands.clear(),
                }
            }
            let mut names: Vec<String> = commands
                .into_iter()
                .map(|c| if raw { c.command } else { c.command.replacen('!', "", 1) })
                .collect();
            names.sort();
            names
        }
        "cooldown" => {
            let mut items: Vec<String> = registry
                .cooldowns()
                .await?
                .into_iter()
                .filter(|c| c.enabled)
                .map(|c| format!("{}: {}s", c.name, format_number(c.millis as f64 / 1000.0)))
                .collect();
            items.sort();
            items
        }
        "price" => {
            let mut items = Vec::new();
            for p in registry.prices().await?.into_iter().filter(|p| p.enabled) {
                let label = engine.services.points.name_for(p.price).await?;
                items.push(format!("{} ({}{})", p.command, p.price, label));
            }
            items
        }
        "ranks" => {
            let mut ranks = registry.ranks().await?;
            ranks.sort_by_key(|r| r.hours);
            ranks.into_iter().map(|r| format!("{} ({}h)", r.rank, r.hours)).collect()
        }
        other => {
            warn!(system = other, "unknown list system");
            return Ok(Some(String::new()));
        }
    };

    Ok(Some(if items.is_empty() { " ".to_owned() } else { items.join(", ") }))
}
