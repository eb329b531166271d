//! Cached access to every entity collection of an environment.
//!
//! [`Repositories`] is the entry point for loading entities. Each accessor pages
//! through the collection endpoint of its entity kind the first time an environment
//! is asked for and serves the same [`Arc<Collection<_>>`] on every later call. The
//! `push_*` hooks seed a collection without any request, which is how snapshots are
//! replayed offline.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rally_cli::api::ApiClient;
//! use rally_cli::config::GlobalConfig;
//! use rally_cli::repository::Repositories;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new(GlobalConfig::load().await?)?;
//! let repos = Repositories::new(client);
//! let rules = repos.rules("DEV").await?;
//! println!("{} rules in DEV", rules.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::api::{ApiClient, index_path_fast};
use crate::cache::Memoized;
use crate::core::{EntityKind, RallyError};
use crate::models::{Collection, Entity, Notification, Preset, Provider, Rule};

type Cache<T> = Memoized<String, Arc<Collection<T>>>;

/// The four collections of one environment, loaded together.
#[derive(Debug, Clone)]
pub struct EnvironmentCollections {
    /// All workflow rules
    pub rules: Arc<Collection<Rule>>,
    /// All presets
    pub presets: Arc<Collection<Preset>>,
    /// All provider types
    pub providers: Arc<Collection<Provider>>,
    /// All notification presets
    pub notifications: Arc<Collection<Notification>>,
}

impl EnvironmentCollections {
    /// Whether an entity of `kind` with `id` exists.
    #[must_use]
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        match kind {
            EntityKind::Rule => self.rules.contains_id(id),
            EntityKind::Preset => self.presets.contains_id(id),
            EntityKind::Provider => self.providers.contains_id(id),
            EntityKind::Notification => self.notifications.contains_id(id),
        }
    }
}

/// Per-environment cached repositories for every entity kind.
#[derive(Debug)]
pub struct Repositories {
    client: ApiClient,
    rules: Cache<Rule>,
    presets: Cache<Preset>,
    providers: Cache<Provider>,
    notifications: Cache<Notification>,
}

impl Repositories {
    /// Create repositories that fetch through `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            rules: Memoized::new(),
            presets: Memoized::new(),
            providers: Memoized::new(),
            notifications: Memoized::new(),
        }
    }

    /// The client used for fetches and code downloads.
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    /// All workflow rules of `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection has to be fetched and the fetch fails.
    pub async fn rules(&self, env: &str) -> Result<Arc<Collection<Rule>>> {
        self.rules.get_or_try_fetch(env.to_string(), |env| self.fetch_all(env)).await
    }

    /// All presets of `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection has to be fetched and the fetch fails.
    pub async fn presets(&self, env: &str) -> Result<Arc<Collection<Preset>>> {
        self.presets.get_or_try_fetch(env.to_string(), |env| self.fetch_all(env)).await
    }

    /// All provider types of `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection has to be fetched and the fetch fails.
    pub async fn providers(&self, env: &str) -> Result<Arc<Collection<Provider>>> {
        self.providers.get_or_try_fetch(env.to_string(), |env| self.fetch_all(env)).await
    }

    /// All notification presets of `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection has to be fetched and the fetch fails.
    pub async fn notifications(&self, env: &str) -> Result<Arc<Collection<Notification>>> {
        self.notifications.get_or_try_fetch(env.to_string(), |env| self.fetch_all(env)).await
    }

    /// Load all four collections of `env` concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first error of any of the four loads.
    pub async fn load_all(&self, env: &str) -> Result<EnvironmentCollections> {
        let (rules, presets, providers, notifications) = tokio::try_join!(
            self.rules(env),
            self.presets(env),
            self.providers(env),
            self.notifications(env)
        )?;

        Ok(EnvironmentCollections {
            rules,
            presets,
            providers,
            notifications,
        })
    }

    /// Seed the rules of `env`; later [`rules`](Self::rules) calls return it.
    pub fn push_rules(&self, env: impl Into<String>, rules: Collection<Rule>) -> Arc<Collection<Rule>> {
        push(&self.rules, env.into(), rules)
    }

    /// Seed the presets of `env`.
    pub fn push_presets(
        &self,
        env: impl Into<String>,
        presets: Collection<Preset>,
    ) -> Arc<Collection<Preset>> {
        push(&self.presets, env.into(), presets)
    }

    /// Seed the provider types of `env`.
    pub fn push_providers(
        &self,
        env: impl Into<String>,
        providers: Collection<Provider>,
    ) -> Arc<Collection<Provider>> {
        push(&self.providers, env.into(), providers)
    }

    /// Seed the notification presets of `env`.
    pub fn push_notifications(
        &self,
        env: impl Into<String>,
        notifications: Collection<Notification>,
    ) -> Arc<Collection<Notification>> {
        push(&self.notifications, env.into(), notifications)
    }

    /// Find a rule of `env` by name.
    ///
    /// An exact match wins; otherwise the first rule whose name contains `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RallyError::EntityNotFound`] if no rule matches, or the load error
    /// if the rules cannot be fetched.
    pub async fn find_rule(&self, env: &str, name: &str) -> Result<Arc<Rule>> {
        let rules = self.rules(env).await?;
        let found = rules.find_by_name(name).or_else(|| rules.find_by_name_contains(name));
        found.cloned().ok_or_else(|| {
            RallyError::EntityNotFound {
                kind: EntityKind::Rule.to_string(),
                name: name.to_string(),
                env: env.to_string(),
            }
            .into()
        })
    }

    /// Download the code of every preset in `presets`, up to the client's
    /// parallelism limit at a time.
    ///
    /// # Errors
    ///
    /// Returns the first download error; downloads still in flight are dropped.
    pub async fn download_code(&self, presets: &Collection<Preset>) -> Result<()> {
        let limit = self.client.max_parallel();
        debug!("Downloading code of {} presets, {limit} at a time", presets.len());

        stream::iter(presets.iter().map(|preset| preset.download_code(&self.client)))
            .buffer_unordered(limit)
            .try_collect::<Vec<()>>()
            .await?;
        Ok(())
    }

    async fn fetch_all<T: Entity>(&self, env: String) -> Result<Arc<Collection<T>>> {
        let path = T::KIND.index_path();
        let records = index_path_fast(&self.client, &env, &path)
            .await
            .with_context(|| format!("Failed to load {}s from {env}", T::KIND))?;

        let entities = records
            .into_iter()
            .map(|record| T::from_value(record, &env))
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} {}s from {env}", entities.len(), T::KIND);

        Ok(Arc::new(Collection::from_entities(entities)))
    }
}

fn push<T>(cache: &Cache<T>, env: String, collection: Collection<T>) -> Arc<Collection<T>> {
    let collection = Arc::new(collection);
    cache.cache_push(env, Arc::clone(&collection));
    collection
}
