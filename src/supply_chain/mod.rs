//! Supply chain discovery.
//!
//! The supply chain of a rule is everything needed to run it: the rules reachable
//! from it, the presets their code calls by name, and the notifications they send.
//! [`SupplyChain::calculate`] finds it in four steps:
//!
//! 1. Load the rule's environment (rules, presets, providers, notifications).
//! 2. Download the code of every preset in that environment.
//! 3. Collect the names long enough to count as code references.
//! 4. Walk a worklist seeded with the starting rule. Each rule contributes its pass
//!    and error successors and its notifications; its bound preset's code is scanned
//!    for rule, preset and notification names. Rules found that way join the
//!    worklist; presets found that way are recorded but their code is not scanned.
//!
//! Presets enter the result only through code references. A rule's bound preset is
//! scanned, but it is part of the result only if some scanned code names it.
//!
//! # Modules
//!
//! - `sink` - [`EntitySink`] and the repository directory sink [`RepoDirSink`]

mod sink;

pub use sink::{EntitySink, RepoDirSink, sanitize_file_name};

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::core::EntityKind;
use crate::models::{Collection, Entity, Notification, Preset, Rule};
use crate::repository::{EnvironmentCollections, Repositories};
use crate::scanner::candidate_names;
use crate::utils::progress::{ProgressReporter, TraversalStep};

/// Names that count as code references, per entity kind.
#[derive(Debug, Default)]
struct CandidateNames {
    rules: Vec<String>,
    presets: Vec<String>,
    notifications: Vec<String>,
}

impl CandidateNames {
    fn new(collections: &EnvironmentCollections) -> Self {
        Self {
            rules: candidate_names(collections.rules.names()),
            presets: candidate_names(collections.presets.names()),
            notifications: candidate_names(collections.notifications.names()),
        }
    }
}

/// Worklist state of one traversal.
///
/// Membership is tracked by `(kind, id)`, never by object identity.
#[derive(Debug, Default)]
struct Traversal {
    rules: Vec<Arc<Rule>>,
    presets: Vec<Arc<Preset>>,
    notifications: Vec<Arc<Notification>>,
    seen: HashSet<(EntityKind, String)>,
    scanned: HashSet<String>,
}

impl Traversal {
    fn new(starting_rule: Arc<Rule>) -> Self {
        let mut traversal = Self::default();
        traversal.add_rule(&starting_rule);
        traversal
    }

    fn add_rule(&mut self, rule: &Arc<Rule>) -> bool {
        if !self.insert(rule.as_ref()) {
            return false;
        }
        self.rules.push(Arc::clone(rule));
        true
    }

    fn add_preset(&mut self, preset: &Arc<Preset>) -> bool {
        if !self.insert(preset.as_ref()) {
            return false;
        }
        self.presets.push(Arc::clone(preset));
        true
    }

    fn add_notification(&mut self, notification: &Arc<Notification>) -> bool {
        if !self.insert(notification.as_ref()) {
            return false;
        }
        self.notifications.push(Arc::clone(notification));
        true
    }

    fn insert<T: Entity>(&mut self, entity: &T) -> bool {
        self.seen.insert((T::KIND, entity.id().to_string()))
    }

    /// Scan a bound preset's code once. Returns the rules and presets it references.
    fn scan(
        &mut self,
        preset: &Preset,
        candidates: &CandidateNames,
        collections: &EnvironmentCollections,
    ) -> (Vec<Arc<Rule>>, Vec<Arc<Preset>>) {
        if !self.scanned.insert(preset.id().to_string()) {
            return (Vec::new(), Vec::new());
        }

        let found_presets: Vec<Arc<Preset>> = preset
            .find_strings_in_code(&candidates.presets)
            .into_iter()
            .filter_map(|name| collections.presets.find_by_name(name).cloned())
            .collect();
        let found_rules: Vec<Arc<Rule>> = preset
            .find_strings_in_code(&candidates.rules)
            .into_iter()
            .filter_map(|name| collections.rules.find_by_name(name).cloned())
            .collect();
        let found_notifications: Vec<Arc<Notification>> = preset
            .find_strings_in_code(&candidates.notifications)
            .into_iter()
            .filter_map(|name| collections.notifications.find_by_name(name).cloned())
            .collect();

        for found in &found_presets {
            self.add_preset(found);
        }
        for found in &found_rules {
            self.add_rule(found);
        }
        for found in &found_notifications {
            self.add_notification(found);
        }

        (found_rules, found_presets)
    }
}

/// The supply chain of one starting rule.
///
/// Results are `None` until [`calculate`](Self::calculate) succeeds.
#[derive(Debug)]
pub struct SupplyChain {
    starting_rule: Arc<Rule>,
    remote: String,
    collections: Option<EnvironmentCollections>,
    rules: Option<Collection<Rule>>,
    presets: Option<Collection<Preset>>,
    notifications: Option<Vec<Arc<Notification>>>,
}

impl SupplyChain {
    /// Prepare the supply chain of `starting_rule`, in the rule's environment.
    #[must_use]
    pub fn new(starting_rule: Arc<Rule>) -> Self {
        let remote = starting_rule.remote().to_string();
        Self {
            starting_rule,
            remote,
            collections: None,
            rules: None,
            presets: None,
            notifications: None,
        }
    }

    /// The rule the chain starts from.
    #[must_use]
    pub fn starting_rule(&self) -> &Arc<Rule> {
        &self.starting_rule
    }

    /// Environment the chain is calculated in.
    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Reachable rules in discovery order, starting rule first.
    #[must_use]
    pub fn rules(&self) -> Option<&Collection<Rule>> {
        self.rules.as_ref()
    }

    /// Presets referenced from scanned code, in discovery order.
    #[must_use]
    pub fn presets(&self) -> Option<&Collection<Preset>> {
        self.presets.as_ref()
    }

    /// Notifications used by the reachable rules and code, without duplicates.
    #[must_use]
    pub fn notifications(&self) -> Option<&[Arc<Notification>]> {
        self.notifications.as_deref()
    }

    /// Whether [`calculate`](Self::calculate) has completed.
    #[must_use]
    pub fn is_calculated(&self) -> bool {
        self.rules.is_some()
    }

    /// Discover the supply chain.
    ///
    /// On failure the error is returned and no result is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if any collection cannot be loaded or any preset's code
    /// cannot be downloaded.
    pub async fn calculate(
        &mut self,
        repos: &Repositories,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        let env = self.remote.clone();

        reporter.stage_started("Getting rules, presets, providers and notifications");
        let collections = repos
            .load_all(&env)
            .await
            .with_context(|| format!("Failed to load the {env} environment"))?;
        reporter.stage_finished(&format!(
            "{} rules, {} presets, {} providers, {} notifications",
            collections.rules.len(),
            collections.presets.len(),
            collections.providers.len(),
            collections.notifications.len()
        ));

        reporter.stage_started("Downloading code");
        repos.download_code(&collections.presets).await?;
        reporter.stage_finished("Done!");

        reporter.stage_started("Calculating supply chain");
        let candidates = CandidateNames::new(&collections);
        let traversal = traverse(&self.starting_rule, &collections, &candidates, reporter);
        reporter.stage_finished(&format!(
            "{} rules, {} presets, {} notifications",
            traversal.rules.len(),
            traversal.presets.len(),
            traversal.notifications.len()
        ));
        info!(
            "Supply chain of {} in {env}: {} rules, {} presets, {} notifications",
            self.starting_rule.name(),
            traversal.rules.len(),
            traversal.presets.len(),
            traversal.notifications.len()
        );

        self.rules = Some(Collection::from_arcs(traversal.rules));
        self.presets = Some(Collection::from_arcs(traversal.presets));
        self.notifications = Some(traversal.notifications);
        self.collections = Some(collections);
        Ok(())
    }

    /// Hand every preset, then every rule, of the result to `sink`.
    ///
    /// Presets are resolved first so that their provider names are attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain has not been calculated or the sink fails.
    pub async fn sync_to<S>(&self, target: &str, sink: &S) -> Result<()>
    where
        S: EntitySink + ?Sized,
    {
        let (Some(rules), Some(presets), Some(collections)) =
            (&self.rules, &self.presets, &self.collections)
        else {
            anyhow::bail!("Supply chain of {} has not been calculated", self.starting_rule.name());
        };

        for preset in presets {
            preset.resolve_in(collections);
            sink.save_preset(preset, target).await?;
        }
        for rule in rules {
            rule.resolve_in(collections);
            sink.save_rule(rule, target).await?;
        }
        Ok(())
    }
}

fn traverse(
    starting_rule: &Arc<Rule>,
    collections: &EnvironmentCollections,
    candidates: &CandidateNames,
    reporter: &dyn ProgressReporter,
) -> Traversal {
    let mut traversal = Traversal::new(Arc::clone(starting_rule));
    let mut next_rule = 0;

    while let Some(rule) = traversal.rules.get(next_rule).cloned() {
        next_rule += 1;
        let resolved = rule.resolve_in(collections);

        for notification in resolved.notifications() {
            traversal.add_notification(notification);
        }
        // Each successor is checked on its own.
        if let Some(error_next) = &resolved.error_next {
            traversal.add_rule(error_next);
        }
        if let Some(pass_next) = &resolved.pass_next {
            traversal.add_rule(pass_next);
        }

        let (found_rules, found_presets) = match &resolved.preset {
            Some(preset) => traversal.scan(preset, candidates, collections),
            None => (Vec::new(), Vec::new()),
        };

        reporter.step(&TraversalStep {
            rule: &rule,
            preset: resolved.preset.as_deref(),
            pass_next: resolved.pass_next.as_deref(),
            error_next: resolved.error_next.as_deref(),
            found_rules: &found_rules,
            found_presets: &found_presets,
        });
    }

    traversal
}
