// ── Domain model ──
//
// The QueryApi exposes five item categories; consumers pick one, or the
// catch-all universal kind that receives the whole snapshot. The tree
// fetched at discovery time is free-form JSON below the kind level, so
// it is kept raw and wrapped with the two accessors the gateway needs.

use std::fmt;

use serde_json::Value;

/// Consumer kind: which slice of the controller state a consumer reads.
///
/// `Alarm` and `Profile` both live in the `globals` snapshot section
/// under fixed pseudo item ids; `Universal` receives the entire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Action,
    Blind,
    Light,
    Load,
    Alarm,
    Profile,
    Universal,
}

impl Kind {
    /// Snapshot/tree section key for this kind, or `None` for the
    /// universal kind which receives the whole payload.
    pub fn section_key(self) -> Option<&'static str> {
        match self {
            Self::Action => Some("actions"),
            Self::Blind => Some("blinds"),
            Self::Light => Some("lights"),
            Self::Load => Some("loads"),
            Self::Alarm | Self::Profile => Some("globals"),
            Self::Universal => None,
        }
    }

    /// Fixed pseudo item id for global kinds. Other kinds resolve their
    /// item id from configuration or the discovery tree.
    pub fn fixed_item_id(self) -> Option<&'static str> {
        match self {
            Self::Alarm => Some("alarm"),
            Self::Profile => Some("profile"),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Action => "action",
            Self::Blind => "blind",
            Self::Light => "light",
            Self::Load => "load",
            Self::Alarm => "alarm",
            Self::Profile => "profile",
            Self::Universal => "universal",
        };
        f.write_str(name)
    }
}

/// The one-time-fetched naming tree: kind → item id → `{name, ...}`.
///
/// Loaded once per gateway lifetime, immutable afterwards, shared as
/// `Arc<DiscoveryTree>` and read concurrently during registration.
#[derive(Debug)]
pub struct DiscoveryTree {
    root: Value,
}

impl DiscoveryTree {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Resolve a display name to an item id within this kind's section.
    ///
    /// First match wins, in the controller's own item order.
    pub fn resolve(&self, kind: Kind, display_name: &str) -> Option<String> {
        let section = self.root.get(kind.section_key()?)?.as_object()?;
        for (item_id, entry) in section {
            if entry.get("name").and_then(Value::as_str) == Some(display_name) {
                return Some(item_id.clone());
            }
        }
        None
    }

    /// Raw tree access (diagnostics only).
    pub fn raw(&self) -> &Value {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_finds_first_matching_name() {
        let tree = DiscoveryTree::new(json!({
            "lights": {
                "item0": { "name": "Hall" },
                "item1": { "name": "Kitchen" },
                "item2": { "name": "Kitchen" },
            }
        }));
        assert_eq!(tree.resolve(Kind::Light, "Kitchen").as_deref(), Some("item1"));
    }

    #[test]
    fn resolve_misses_when_name_absent() {
        let tree = DiscoveryTree::new(json!({ "lights": { "item0": { "name": "Hall" } } }));
        assert_eq!(tree.resolve(Kind::Light, "Garage"), None);
    }

    #[test]
    fn resolve_misses_when_section_absent() {
        let tree = DiscoveryTree::new(json!({}));
        assert_eq!(tree.resolve(Kind::Blind, "Any"), None);
    }

    #[test]
    fn universal_kind_has_no_section() {
        assert_eq!(Kind::Universal.section_key(), None);
        let tree = DiscoveryTree::new(json!({ "lights": {} }));
        assert_eq!(tree.resolve(Kind::Universal, "x"), None);
    }

    #[test]
    fn global_kinds_share_the_globals_section() {
        assert_eq!(Kind::Alarm.section_key(), Some("globals"));
        assert_eq!(Kind::Profile.section_key(), Some("globals"));
        assert_eq!(Kind::Alarm.fixed_item_id(), Some("alarm"));
        assert_eq!(Kind::Profile.fixed_item_id(), Some("profile"));
    }
}
