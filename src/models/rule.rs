//! Workflow rules.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::{Entity, EntityRecord, Notification, Preset, Provider, RelationshipDescriptor};
use crate::core::EntityKind;
use crate::repository::{EnvironmentCollections, Repositories};

const PRESET: RelationshipDescriptor =
    RelationshipDescriptor::new("preset", "/relationships/preset/data", EntityKind::Preset);
const PROVIDER_TYPE: RelationshipDescriptor = RelationshipDescriptor::new(
    "providerType",
    "/relationships/providerType/data",
    EntityKind::Provider,
);
const PASS_NEXT: RelationshipDescriptor =
    RelationshipDescriptor::new("passNext", "/relationships/passNext/data", EntityKind::Rule);
const ERROR_NEXT: RelationshipDescriptor =
    RelationshipDescriptor::new("errorNext", "/relationships/errorNext/data", EntityKind::Rule);
const ENTER_NOTIFICATIONS: RelationshipDescriptor = RelationshipDescriptor::new(
    "enterNotifications",
    "/relationships/enterNotifications/data",
    EntityKind::Notification,
);
const PASS_NOTIFICATIONS: RelationshipDescriptor = RelationshipDescriptor::new(
    "passNotifications",
    "/relationships/passNotifications/data",
    EntityKind::Notification,
);
const ERROR_NOTIFICATIONS: RelationshipDescriptor = RelationshipDescriptor::new(
    "errorNotifications",
    "/relationships/errorNotifications/data",
    EntityKind::Notification,
);

/// A workflow rule: binds a preset and routes to the next rule on pass or error.
#[derive(Debug)]
pub struct Rule {
    record: EntityRecord,
}

/// Everything a rule points at, resolved against its environment.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRule {
    /// Bound preset
    pub preset: Option<Arc<Preset>>,
    /// Provider type the rule runs on
    pub provider_type: Option<Arc<Provider>>,
    /// Next rule on success
    pub pass_next: Option<Arc<Rule>>,
    /// Next rule on failure
    pub error_next: Option<Arc<Rule>>,
    /// Notifications sent when the rule starts
    pub enter_notifications: Vec<Arc<Notification>>,
    /// Notifications sent when the rule passes
    pub pass_notifications: Vec<Arc<Notification>>,
    /// Notifications sent when the rule fails
    pub error_notifications: Vec<Arc<Notification>>,
}

impl ResolvedRule {
    /// All resolved notifications: enter, then error, then pass.
    pub fn notifications(&self) -> impl Iterator<Item = &Arc<Notification>> {
        self.enter_notifications
            .iter()
            .chain(&self.error_notifications)
            .chain(&self.pass_notifications)
    }
}

impl Entity for Rule {
    const KIND: EntityKind = EntityKind::Rule;
    const RELATIONSHIPS: &'static [RelationshipDescriptor] = &[
        PRESET,
        PROVIDER_TYPE,
        PASS_NEXT,
        ERROR_NEXT,
        ENTER_NOTIFICATIONS,
        PASS_NOTIFICATIONS,
        ERROR_NOTIFICATIONS,
    ];

    fn from_record(record: EntityRecord) -> Self {
        Self {
            record,
        }
    }

    fn record(&self) -> &EntityRecord {
        &self.record
    }
}

impl Rule {
    /// Resolve every relationship against already loaded collections.
    ///
    /// Resolved names are attached onto the rule's reference objects. Calling this
    /// again is harmless and gives the same result.
    pub fn resolve_in(&self, collections: &EnvironmentCollections) -> ResolvedRule {
        let rules = collections.rules.as_ref();
        let notifications = collections.notifications.as_ref();

        let resolved = ResolvedRule {
            preset: self.record.resolve_one(collections.presets.as_ref(), &PRESET),
            provider_type: self.record.resolve_one(collections.providers.as_ref(), &PROVIDER_TYPE),
            pass_next: self.record.resolve_one(rules, &PASS_NEXT),
            error_next: self.record.resolve_one(rules, &ERROR_NEXT),
            enter_notifications: self.record.resolve_field(notifications, &ENTER_NOTIFICATIONS),
            pass_notifications: self.record.resolve_field(notifications, &PASS_NOTIFICATIONS),
            error_notifications: self.record.resolve_field(notifications, &ERROR_NOTIFICATIONS),
        };

        for (field, id) in self.dangling_references(collections) {
            debug!("{}: {field} references unknown id {id}", self.chalk_print(false));
        }

        resolved
    }

    /// Resolve every relationship, loading the rule's environment if needed.
    ///
    /// Collections come from the repository caches, so repeated calls do not refetch.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the four collections cannot be loaded.
    pub async fn resolve(&self, repos: &Repositories) -> Result<ResolvedRule> {
        let collections = repos.load_all(self.remote()).await?;
        Ok(self.resolve_in(&collections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{self, RuleFixture};

    fn collections() -> EnvironmentCollections {
        fixtures::collections(
            vec![
                RuleFixture::new("1", "Start")
                    .preset("10")
                    .provider("20")
                    .pass_next("2")
                    .error_next("3")
                    .enter_notifications(&["30"])
                    .pass_notifications(&["31", "99"])
                    .build(),
                RuleFixture::new("2", "Pass Path").build(),
                RuleFixture::new("3", "Error Path").pass_next("404").build(),
            ],
            vec![fixtures::preset_record("10", "Start Preset", "")],
            vec![fixtures::named_record("20", "SdviEvaluate")],
            vec![fixtures::named_record("30", "Slack Ops"), fixtures::named_record("31", "Email QC")],
        )
    }

    #[test]
    fn test_resolve_all_relationships() {
        let collections = collections();
        let start = collections.rules.find_by_id("1").unwrap();

        let resolved = start.resolve_in(&collections);
        assert_eq!(resolved.preset.as_ref().unwrap().name(), "Start Preset");
        assert_eq!(resolved.provider_type.as_ref().unwrap().name(), "SdviEvaluate");
        assert_eq!(resolved.pass_next.as_ref().unwrap().id(), "2");
        assert_eq!(resolved.error_next.as_ref().unwrap().id(), "3");
        assert_eq!(resolved.enter_notifications.len(), 1);
        assert_eq!(resolved.pass_notifications.len(), 1, "unknown id 99 is dropped");
        assert!(resolved.error_notifications.is_empty());

        let names: Vec<&str> = resolved.notifications().map(|n| n.name()).collect();
        assert_eq!(names, vec!["Slack Ops", "Email QC"]);

        assert_eq!(
            start.record().string_at("/relationships/passNext/data/name").as_deref(),
            Some("Pass Path")
        );
        assert_eq!(start.dangling_references(&collections), vec![("passNotifications", "99".to_string())]);
    }

    #[test]
    fn test_missing_relationships_resolve_to_nothing() {
        let collections = collections();
        let leaf = collections.rules.find_by_id("2").unwrap();

        let resolved = leaf.resolve_in(&collections);
        assert!(resolved.preset.is_none());
        assert!(resolved.pass_next.is_none());
        assert!(resolved.error_next.is_none());
        assert_eq!(resolved.notifications().count(), 0);
    }

    #[test]
    fn test_unknown_successor_is_none() {
        let collections = collections();
        let rule = collections.rules.find_by_id("3").unwrap();
        assert!(rule.resolve_in(&collections).pass_next.is_none());
    }

    #[test]
    fn test_snapshot_keeps_names_only() {
        let collections = collections();
        let start = collections.rules.find_by_id("1").unwrap();
        start.resolve_in(&collections);

        let saved = start.snapshot();
        assert!(saved.get("id").is_none());
        assert_eq!(saved["relationships"]["preset"]["data"]["name"], "Start Preset");
        assert!(saved["relationships"]["preset"]["data"].get("id").is_none());
        assert_eq!(saved["relationships"]["passNotifications"]["data"][0]["name"], "Email QC");
    }

    #[test]
    fn test_chalk_print() {
        colored::control::set_override(false);
        let rule = fixtures::rule("7", "Deliver", None);
        assert_eq!(rule.chalk_print(false), "R-DEV-7: Deliver");
        assert_eq!(rule.chalk_print(true), "   R-DEV-7: Deliver");
    }
}
