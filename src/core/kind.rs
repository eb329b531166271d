//! Entity kinds served by the Rally API.

use crate::constants::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four entity types that take part in a supply chain.
///
/// Used as part of the `(kind, id)` keys the traversal uses for membership checks,
/// as the short prefix in console output, and as the sub-directory name entities are
/// synced into.
///
/// ```rust
/// use rally_cli::core::EntityKind;
///
/// assert_eq!(EntityKind::Rule.prefix(), "R");
/// assert_eq!(EntityKind::Preset.directory(), "presets");
/// assert_eq!(EntityKind::Notification.to_string(), "notification");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Workflow rule with pass/error successors
    Rule,
    /// Named unit of executable code
    Preset,
    /// Execution context type a preset runs against
    Provider,
    /// Alert/message preset referenced by rules
    Notification,
}

impl EntityKind {
    /// All kinds, in the order collections are loaded.
    pub const ALL: [Self; 4] = [Self::Rule, Self::Preset, Self::Provider, Self::Notification];

    /// Short prefix used in one-line displays, e.g. `R-DEV-12`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Rule => "R",
            Self::Preset => "P",
            Self::Provider => "PR",
            Self::Notification => "N",
        }
    }

    /// Collection endpoint of this kind, relative to the API root.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Rule => "/workflowRules",
            Self::Preset => "/presets",
            Self::Provider => "/providerTypes",
            Self::Notification => "/notificationPresets",
        }
    }

    /// Collection endpoint requesting the first page at the default page size.
    #[must_use]
    pub fn index_path(self) -> String {
        format!("{}?page=1p{}", self.endpoint(), DEFAULT_PAGE_SIZE)
    }

    /// Sub-directory of the repository directory entities of this kind are saved to.
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Rule => "rules",
            Self::Preset => "presets",
            Self::Provider => "providers",
            Self::Notification => "notifications",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rule => "rule",
            Self::Preset => "preset",
            Self::Provider => "provider",
            Self::Notification => "notification",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&EntityKind::Provider).unwrap();
        assert_eq!(json, "\"provider\"");
        let parsed: EntityKind = serde_json::from_str("\"notification\"").unwrap();
        assert_eq!(parsed, EntityKind::Notification);
    }

    #[test]
    fn test_index_paths_request_first_page() {
        for kind in EntityKind::ALL {
            assert!(kind.index_path().contains("page=1p20"), "{kind} must start at page 1");
        }
    }
}
