//! One notification run, end to end.
//!
//! ```text
//! load store -> list buildpacks -> filter fresh -> list apps -> detect
//!            -> resolve owners -> dispatch -> record fresh buildpacks
//! ```
//!
//! Freshness records are written last, so any fatal error earlier in the run
//! leaves the store as it was and the next run retries the same buildpacks.

use tracing::info;

use crate::core::NotifyError;
use crate::detector::{FreshBuildpacks, find_outdated_apps};
use crate::freshness::{FreshnessStore, filter_fresh};
use crate::mailer::Mailer;
use crate::notify::{DispatchReport, send_notify_emails};
use crate::owners::OwnerResolver;
use crate::platform::PlatformApi;
use crate::release::BuildpackReleaseInfo;
use crate::templating::Templates;

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Names of buildpacks new or updated since the last run
    pub fresh_buildpacks: Vec<String>,
    /// Names of apps flagged as outdated
    pub outdated_apps: Vec<String>,
    /// Per-recipient outcomes
    pub report: DispatchReport,
    /// Freshness records written (zero in dry-run)
    pub recorded: usize,
}

/// Collaborators of a notification run.
pub struct NotifyJob<'a, P, M> {
    /// Platform API
    pub platform: &'a P,
    /// Mail transport
    pub mailer: &'a M,
    /// Email templates
    pub templates: &'a Templates,
    /// Freshness records
    pub store: &'a mut dyn FreshnessStore,
    /// Compute and log, but neither send nor record
    pub dry_run: bool,
}

impl<P: PlatformApi, M: Mailer> NotifyJob<'_, P, M> {
    /// Execute the run.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`NotifyError`]: store access, platform
    /// listings or malformed timestamps. Delivery failures are not errors.
    pub async fn run(self) -> Result<RunSummary, NotifyError> {
        let stored = self.store.load()?;
        let buildpacks = self.platform.list_buildpacks().await?;
        info!(
            installed = buildpacks.len(),
            recorded = stored.len(),
            "checking buildpack freshness"
        );

        let fresh = filter_fresh(buildpacks, &stored)?;
        if fresh.is_empty() {
            info!("no buildpacks updated since the last run; nothing to do");
            return Ok(RunSummary::default());
        }
        let fresh_names: Vec<String> = fresh.iter().map(|bp| bp.name.clone()).collect();
        info!(buildpacks = ?fresh_names, "buildpacks updated since the last run");

        let index = FreshBuildpacks::new(&fresh)?;
        let apps = self.platform.list_apps().await?;
        info!(apps = apps.len(), "checking apps");

        let outdated = find_outdated_apps(self.platform, apps, &index).await?;
        info!(outdated = outdated.len(), "outdated apps found");

        let owners = OwnerResolver::new(self.platform).resolve(&outdated).await?;
        let releases: Vec<BuildpackReleaseInfo> =
            fresh.iter().map(BuildpackReleaseInfo::from_buildpack).collect();

        let report =
            send_notify_emails(&owners, &releases, self.templates, self.mailer, self.dry_run).await;
        info!(
            recipients = owners.len(),
            sent = report.sent(),
            failed = report.failed(),
            skipped = report.skipped(),
            "notification dispatch finished"
        );

        let mut recorded = 0;
        for buildpack in &fresh {
            if self.dry_run {
                info!(
                    buildpack = %buildpack.name,
                    updated_at = %buildpack.updated_at,
                    "would record buildpack"
                );
                continue;
            }
            self.store.save(buildpack)?;
            recorded += 1;
        }

        Ok(RunSummary {
            fresh_buildpacks: fresh_names,
            outdated_apps: outdated.iter().map(|o| o.app.name.clone()).collect(),
            report,
            recorded,
        })
    }
}
