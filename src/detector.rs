//! Outdated-app detection.
//!
//! An app is outdated when the droplet it currently runs was built before one
//! of its buildpacks was updated. Per app the decision is a short sequence of
//! early exits:
//!
//! 1. the app must be `STARTED`
//! 2. it must have exactly one current droplet (otherwise logged and skipped)
//! 3. the first droplet buildpack whose name is in the fresh set is selected
//!    (no match means the app is unaffected)
//! 4. the app is outdated iff `buildpack.updated_at > droplet.created_at`
//!
//! Malformed timestamps abort the run. Per-app inconsistencies never do.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::{NotifyError, parse_timestamp};
use crate::models::{App, Buildpack, OutdatedApp};
use crate::platform::PlatformApi;

/// Fresh buildpacks keyed by name with their parsed update time.
#[derive(Debug, Default)]
pub struct FreshBuildpacks {
    by_name: HashMap<String, DateTime<Utc>>,
}

impl FreshBuildpacks {
    /// Index `buildpacks` by name.
    ///
    /// Buildpacks sharing a name (one per stack) collapse to the most recent
    /// update.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidTimestamp`] for a malformed `updated_at`.
    pub fn new(buildpacks: &[Buildpack]) -> Result<Self, NotifyError> {
        let mut by_name: HashMap<String, DateTime<Utc>> = HashMap::new();
        for buildpack in buildpacks {
            let updated = parse_timestamp(
                &buildpack.updated_at,
                format!("buildpack {}", buildpack.guid),
            )?;
            by_name
                .entry(buildpack.name.clone())
                .and_modify(|existing| *existing = (*existing).max(updated))
                .or_insert(updated);
        }
        Ok(Self { by_name })
    }

    /// Update time of the fresh buildpack called `name`.
    pub fn updated_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.by_name.get(name).copied()
    }

    /// Number of distinct fresh buildpack names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no buildpack is fresh.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// The outdated rule: the buildpack changed strictly after the droplet was built.
pub fn is_outdated(droplet_created: DateTime<Utc>, buildpack_updated: DateTime<Utc>) -> bool {
    buildpack_updated > droplet_created
}

/// Flag the apps in `apps` whose current droplet predates a fresh buildpack.
///
/// Output preserves the order of `apps`; each app appears at most once.
///
/// # Errors
///
/// Returns [`NotifyError::Fetch`] if a droplet listing fails and
/// [`NotifyError::InvalidTimestamp`] for a malformed droplet `created_at`.
pub async fn find_outdated_apps<P: PlatformApi>(
    platform: &P,
    apps: Vec<App>,
    fresh: &FreshBuildpacks,
) -> Result<Vec<OutdatedApp>, NotifyError> {
    let mut outdated = Vec::new();

    for app in apps {
        if !app.is_started() {
            debug!(app = %app.name, state = ?app.state, "skipping app that is not started");
            continue;
        }

        let mut droplets = platform.list_current_droplets(&app.guid).await?;
        if droplets.len() != 1 {
            warn!(
                app = %app.name,
                guid = %app.guid,
                count = droplets.len(),
                "expected exactly one current droplet; skipping app"
            );
            continue;
        }
        let droplet = droplets.remove(0);

        let Some((name, updated)) = droplet
            .buildpacks
            .iter()
            .find_map(|bp| fresh.updated_at(&bp.name).map(|at| (bp.name.as_str(), at)))
        else {
            continue;
        };

        let created = parse_timestamp(&droplet.created_at, format!("droplet {}", droplet.guid))?;
        if is_outdated(created, updated) {
            info!(app = %app.name, buildpack = %name, "app runs an outdated buildpack");
            let buildpack = name.to_string();
            outdated.push(OutdatedApp { app, buildpack });
        }
    }

    Ok(outdated)
}
