//! Shared state for CLI commands.

use anyhow::Result;

use super::CliConfig;
use crate::api::ApiClient;
use crate::config::GlobalConfig;
use crate::core::RallyError;
use crate::repository::Repositories;
use crate::supply_chain::RepoDirSink;
use crate::utils::progress::{ConsoleReporter, ProgressReporter, SilentReporter};

/// Everything a command needs: the loaded configuration, repositories over a
/// client built from it, and the output flags.
#[derive(Debug)]
pub struct CommandContext {
    pub repos: Repositories,
    pub verbose: bool,
    pub quiet: bool,
    pub no_progress: bool,
}

impl CommandContext {
    /// Load the global configuration and build an HTTP client from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the HTTP client
    /// cannot be built.
    pub async fn load(cli: &CliConfig) -> Result<Self> {
        let config = GlobalConfig::load_with_optional(cli.config_path.clone()).await?;
        let client = ApiClient::new(config)?;
        Ok(Self::with_client(client, cli))
    }

    /// Context over an existing client.
    #[must_use]
    pub fn with_client(client: ApiClient, cli: &CliConfig) -> Self {
        Self {
            repos: Repositories::new(client.danger_modify(cli.danger_modify)),
            verbose: cli.verbose,
            quiet: cli.quiet,
            no_progress: cli.no_progress,
        }
    }

    /// The global configuration in effect.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        self.repos.client().config()
    }

    /// The environment to act on: `explicit`, else the configured `default_env`.
    ///
    /// # Errors
    ///
    /// Returns [`RallyError::ConfigError`] if neither is set.
    pub fn env(&self, explicit: Option<String>) -> Result<String> {
        self.config().resolve_env(explicit).ok_or_else(|| {
            RallyError::ConfigError {
                message: "No environment supplied; pass --env or set default_env".to_string(),
            }
            .into()
        })
    }

    /// Reporter matching the output flags.
    #[must_use]
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        if self.quiet {
            Box::new(SilentReporter)
        } else {
            Box::new(ConsoleReporter::new(self.verbose, self.no_progress))
        }
    }

    /// Sink writing into the configured repository directory.
    ///
    /// # Errors
    ///
    /// Returns [`RallyError::ConfigError`] if no `repodir` is configured.
    pub fn repo_sink(&self) -> Result<RepoDirSink> {
        let root = self.config().repodir.clone().ok_or_else(|| RallyError::ConfigError {
            message: "No repodir configured; set `repodir` in the global config".to_string(),
        })?;
        Ok(RepoDirSink::new(root))
    }

    /// Print a line unless `--quiet` is set.
    pub fn say(&self, line: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", line.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeTransport, fixtures};
    use std::sync::Arc;

    fn context(config: GlobalConfig) -> CommandContext {
        let client = ApiClient::with_transport(config, Arc::new(FakeTransport::new()));
        CommandContext::with_client(client, &CliConfig::default())
    }

    #[test]
    fn test_env_falls_back_to_default() {
        let mut config = fixtures::config(&["DEV", "UAT"]);
        assert!(context(config.clone()).env(None).is_err());

        config.default_env = Some("UAT".to_string());
        let ctx = context(config);
        assert_eq!(ctx.env(None).unwrap(), "UAT");
        assert_eq!(ctx.env(Some("DEV".to_string())).unwrap(), "DEV");
    }

    #[test]
    fn test_repo_sink_requires_repodir() {
        let mut config = fixtures::config(&["DEV"]);
        let err = context(config.clone()).repo_sink().unwrap_err();
        assert!(matches!(err.downcast_ref::<RallyError>(), Some(RallyError::ConfigError { .. })));

        config.repodir = Some("/tmp/rally-repo".into());
        assert_eq!(context(config).repo_sink().unwrap().root(), std::path::Path::new("/tmp/rally-repo"));
    }
}
