//! In-process fakes for the platform API and the mail transport.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{FetchError, MailError};
use crate::mailer::Mailer;
use crate::models::{App, Buildpack, Droplet, SpaceInfo, SpaceRole, SpaceUser};
use crate::platform::PlatformApi;

/// Platform API backed by in-memory fixtures.
///
/// Unknown spaces answer like a missing resource (HTTP 404). Request counters
/// let tests assert on caching and early exits.
#[derive(Debug, Default)]
pub struct FakePlatform {
    apps: Vec<App>,
    buildpacks: Vec<Buildpack>,
    droplets: HashMap<String, Vec<Droplet>>,
    spaces: HashMap<String, SpaceInfo>,
    roles: HashMap<(String, SpaceRole), Vec<SpaceUser>>,
    failing_droplets: HashSet<String>,
    app_requests: AtomicUsize,
    droplet_requests: AtomicUsize,
    space_requests: AtomicUsize,
}

impl FakePlatform {
    /// Add an app to the listing.
    pub fn with_app(mut self, app: App) -> Self {
        self.apps.push(app);
        self
    }

    /// Add a buildpack to the listing.
    pub fn with_buildpack(mut self, buildpack: Buildpack) -> Self {
        self.buildpacks.push(buildpack);
        self
    }

    /// Add a current droplet for `app_guid`. Call twice for an inconsistent app.
    pub fn with_droplet(mut self, app_guid: &str, droplet: Droplet) -> Self {
        self.droplets
            .entry(app_guid.to_string())
            .or_default()
            .push(droplet);
        self
    }

    /// Register a space.
    pub fn with_space(mut self, space: SpaceInfo) -> Self {
        self.spaces.insert(space.guid.clone(), space);
        self
    }

    /// Grant `role` in `space_guid` to the user `guid` named `username`.
    pub fn with_role(
        mut self,
        space_guid: &str,
        role: SpaceRole,
        guid: &str,
        username: &str,
    ) -> Self {
        self.roles
            .entry((space_guid.to_string(), role))
            .or_default()
            .push(SpaceUser::new(guid, username, role));
        self
    }

    /// Make droplet lookups for `app_guid` fail with HTTP 500.
    pub fn failing_droplets_for(mut self, app_guid: &str) -> Self {
        self.failing_droplets.insert(app_guid.to_string());
        self
    }

    /// Number of app listings served.
    pub fn app_requests(&self) -> usize {
        self.app_requests.load(Ordering::SeqCst)
    }

    /// Number of droplet lookups served.
    pub fn droplet_requests(&self) -> usize {
        self.droplet_requests.load(Ordering::SeqCst)
    }

    /// Number of space lookups served.
    pub fn space_requests(&self) -> usize {
        self.space_requests.load(Ordering::SeqCst)
    }
}

impl PlatformApi for FakePlatform {
    async fn list_apps(&self) -> Result<Vec<App>, FetchError> {
        self.app_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.apps.clone())
    }

    async fn list_buildpacks(&self) -> Result<Vec<Buildpack>, FetchError> {
        Ok(self.buildpacks.clone())
    }

    async fn list_current_droplets(&self, app_guid: &str) -> Result<Vec<Droplet>, FetchError> {
        self.droplet_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing_droplets.contains(app_guid) {
            return Err(FetchError::Status {
                path: format!("/v3/apps/{app_guid}/droplets?current=true"),
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.droplets.get(app_guid).cloned().unwrap_or_default())
    }

    async fn list_space_roles(
        &self,
        space_guid: &str,
        role: SpaceRole,
    ) -> Result<Vec<SpaceUser>, FetchError> {
        Ok(self
            .roles
            .get(&(space_guid.to_string(), role))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_space(&self, space_guid: &str) -> Result<SpaceInfo, FetchError> {
        self.space_requests.fetch_add(1, Ordering::SeqCst);
        self.spaces
            .get(space_guid)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                path: format!("/v3/spaces/{space_guid}"),
                status: 404,
                body: String::new(),
            })
    }
}

/// An email captured by [`RecordingMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Body as UTF-8 text
    pub body: String,
}

/// Mailer that records every accepted email.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    failing: HashSet<String>,
}

impl RecordingMailer {
    /// Reject every email to `recipient`.
    pub fn failing_for(mut self, recipient: &str) -> Self {
        self.failing.insert(recipient.to_string());
        self
    }

    /// Emails accepted so far, in send order.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &[u8],
    ) -> Result<(), MailError> {
        if self.failing.contains(recipient) {
            return Err(MailError::Disabled);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: String::from_utf8_lossy(body).into_owned(),
            });
        }
        Ok(())
    }
}
