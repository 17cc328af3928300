//! Command-line interface for buildpack-notify.
//!
//! The binary has three modes selected by flags:
//!
//! - `--notify`: run one notification pass and exit
//! - `--clear`: delete every freshness record first; combined with
//!   `--notify` the pass then runs against the emptied store
//! - without `--notify`: serve the health-check endpoints until terminated,
//!   after clearing if `--clear` was given
//!
//! `--dry-run` applies to both `--notify` and `--clear`: everything is
//! computed and logged, but no email is sent and the store is not modified.
//!
//! # Examples
//!
//! ```bash
//! # Scheduled run
//! buildpack-notify --notify
//!
//! # See who would be notified without sending or recording anything
//! buildpack-notify --notify --dry-run --verbose
//!
//! # Forget every buildpack seen so far
//! buildpack-notify --clear
//! ```
//!
//! Logging goes to stderr through `tracing`. `RUST_LOG` takes precedence over
//! `--verbose` and `--quiet`.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::NotifyError;
use crate::freshness::{FreshnessStore, open_store};
use crate::mailer::{DisabledMailer, Mailer, SmtpMailer};
use crate::pipeline::{NotifyJob, RunSummary};
use crate::platform::CfClient;
use crate::server;
use crate::templating::Templates;

/// Notify space owners about apps running on outdated buildpacks.
#[derive(Parser, Debug)]
#[command(
    name = "buildpack-notify",
    version,
    about = "Notify Cloud Foundry space owners about apps running on outdated buildpacks",
    long_about = "Compares every started app's current droplet against buildpacks updated since \
                  the last run and emails the space developers and managers of outdated apps. \
                  Without --notify the process only serves health checks."
)]
pub struct Cli {
    /// Run one notification pass and exit.
    #[arg(long)]
    pub notify: bool,

    /// Delete every stored buildpack freshness record.
    ///
    /// With `--notify` the notification pass then runs against the emptied
    /// store; without it the process goes on to serve health checks.
    #[arg(long)]
    pub clear: bool,

    /// Compute and log, but send no email and leave the store untouched.
    #[arg(long)]
    pub dry_run: bool,

    /// Log debug output, including every API page fetched.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log warnings and errors only.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level implied by the verbosity flags.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Install the global tracing subscriber.
    ///
    /// `RUST_LOG` wins over the verbosity flags when set.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("buildpack_notify={}", self.log_level())));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Execute with configuration read from the process environment.
    ///
    /// # Errors
    ///
    /// Returns any fatal configuration, platform, store or template error.
    pub async fn execute(self) -> Result<()> {
        let config = Config::from_env()?;
        self.execute_with_config(config).await
    }

    /// Execute with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns any fatal configuration, platform, store or template error.
    /// Failed deliveries are logged, not returned.
    pub async fn execute_with_config(self, config: Config) -> Result<()> {
        if self.clear {
            self.clear_store(&config)?;
        }

        if self.notify {
            let summary = self.run_notify(&config).await?;
            info!(
                fresh = summary.fresh_buildpacks.len(),
                outdated = summary.outdated_apps.len(),
                notified = summary.report.deliveries.len(),
                failed = summary.report.failed(),
                recorded = summary.recorded,
                "notification run complete"
            );
            return Ok(());
        }

        let port = config.port()?;
        server::serve(port).await?;
        Ok(())
    }

    /// Clear the configured store. Returns the number of records removed (or,
    /// in dry-run, that would be removed); `None` when no database is
    /// configured and there is nothing persistent to clear.
    fn clear_store(&self, config: &Config) -> Result<Option<usize>> {
        let Some(location) = config.database()? else {
            warn!("no DATABASE_URL configured; there are no persistent records to clear");
            return Ok(None);
        };
        let mut store = open_store(Some(&location))?;

        if self.dry_run {
            let records = store.load()?.len();
            info!(records, "would clear freshness records");
            return Ok(Some(records));
        }

        let removed = store.clear().context("Failed to clear freshness records")?;
        info!(removed, "cleared freshness records");
        Ok(Some(removed))
    }

    async fn run_notify(&self, config: &Config) -> Result<RunSummary, NotifyError> {
        let platform_config = config.platform()?;
        let smtp = if self.dry_run {
            None
        } else {
            Some(config.smtp()?)
        };

        let templates = Templates::load(&config.template_dir())?;
        let mut store = open_store(config.database()?.as_ref())?;
        let platform = CfClient::connect(&platform_config).await?;

        let summary = match smtp {
            Some(smtp) => {
                let mailer = SmtpMailer::new(&smtp)?;
                run_job(&platform, &mailer, &templates, store.as_mut(), false).await?
            }
            None => {
                warn!("dry run: no email will be sent and no buildpack will be recorded");
                run_job(&platform, &DisabledMailer, &templates, store.as_mut(), true).await?
            }
        };
        Ok(summary)
    }
}

async fn run_job<M: Mailer>(
    platform: &CfClient,
    mailer: &M,
    templates: &Templates,
    store: &mut dyn FreshnessStore,
    dry_run: bool,
) -> Result<RunSummary, NotifyError> {
    NotifyJob {
        platform,
        mailer,
        templates,
        store,
        dry_run,
    }
    .run()
    .await
}
