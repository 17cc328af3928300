//! Data models for platform resources and notification results.
//!
//! Wire structs mirror the Cloud Foundry V3 JSON objects for apps, droplets
//! and buildpacks. Fields this job does not read are omitted; optional fields
//! default so that older API versions still decode. Timestamps stay as wire
//! strings and are parsed with [`crate::core::parse_timestamp`] where they are
//! compared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle state of an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    /// Running; eligible for restage notifications
    Started,
    /// Stopped by its owners
    Stopped,
    /// Any state this job does not know about
    #[serde(other)]
    Unknown,
}

/// A V3 app object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// App GUID
    pub guid: String,
    /// Display name
    pub name: String,
    /// Lifecycle state
    pub state: AppState,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp (package or manifest changes)
    #[serde(default)]
    pub updated_at: String,
    /// Buildpack lifecycle configuration
    #[serde(default)]
    pub lifecycle: Lifecycle,
    /// Links to the owning space
    #[serde(default)]
    pub relationships: AppRelationships,
}

impl App {
    /// GUID of the owning space, if the API reported one.
    pub fn space_guid(&self) -> Option<&str> {
        self.relationships
            .space
            .data
            .as_ref()
            .map(|data| data.guid.as_str())
            .filter(|guid| !guid.is_empty())
    }

    /// Whether the app is in the `STARTED` state.
    pub fn is_started(&self) -> bool {
        self.state == AppState::Started
    }
}

/// Lifecycle block of an app (`buildpack` or `docker`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Lifecycle type
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Declared buildpacks and stack
    #[serde(default)]
    pub data: LifecycleData,
}

/// Declared buildpacks and stack of an app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleData {
    /// Buildpack names or URLs declared in the manifest; empty means auto-detect
    #[serde(default)]
    pub buildpacks: Vec<String>,
    /// Stack name
    #[serde(default)]
    pub stack: Option<String>,
}

/// Relationships of an app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRelationships {
    /// Owning space
    #[serde(default)]
    pub space: ToOneRelationship,
}

/// A V3 to-one relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToOneRelationship {
    /// Related resource, absent when the relationship is unset
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

/// Target of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipData {
    /// GUID of the related resource
    pub guid: String,
}

/// A V3 droplet object: the built artifact an app runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Droplet {
    /// Droplet GUID
    pub guid: String,
    /// Staging state (`STAGED`, `FAILED`, ...)
    #[serde(default)]
    pub state: String,
    /// Staging error, if any
    #[serde(default)]
    pub error: Option<String>,
    /// When the droplet was built
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
    /// Buildpacks that took part in staging, in detection order
    #[serde(default)]
    pub buildpacks: Vec<DropletBuildpack>,
}

/// A buildpack recorded on a droplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletBuildpack {
    /// Admin buildpack name (the comparison key)
    pub name: String,
    /// Output of the buildpack's detect step
    #[serde(default)]
    pub detect_output: Option<String>,
    /// Name the buildpack reported for itself
    #[serde(default)]
    pub buildpack_name: Option<String>,
    /// Version the buildpack reported for itself
    #[serde(default)]
    pub version: Option<String>,
}

/// A V3 buildpack object as installed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buildpack {
    /// Buildpack GUID; key of the freshness store
    pub guid: String,
    /// Buildpack name; key for matching against droplets
    pub name: String,
    /// Stack the buildpack targets
    #[serde(default)]
    pub stack: Option<String>,
    /// Uploaded package filename, e.g. `python_buildpack-cflinuxfs3-v1.7.43.zip`
    #[serde(default)]
    pub filename: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Space with the name of its organization, for email context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceInfo {
    /// Space GUID
    pub guid: String,
    /// Space name
    pub name: String,
    /// Organization name
    pub org_name: String,
}

/// Space-level roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpaceRole {
    /// `space_developer`
    #[serde(rename = "space_developer")]
    Developer,
    /// `space_manager`
    #[serde(rename = "space_manager")]
    Manager,
    /// `space_auditor`
    #[serde(rename = "space_auditor")]
    Auditor,
}

impl SpaceRole {
    /// Roles whose holders are notified about outdated apps.
    pub const OWNERS: [SpaceRole; 2] = [SpaceRole::Developer, SpaceRole::Manager];

    /// Role name as used by the API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "space_developer",
            Self::Manager => "space_manager",
            Self::Auditor => "space_auditor",
        }
    }

    /// V2 space collection listing the holders of this role.
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Developer => "developers",
            Self::Manager => "managers",
            Self::Auditor => "auditors",
        }
    }

    /// Whether holding this role makes a user an owner.
    pub fn is_owner(self) -> bool {
        Self::OWNERS.contains(&self)
    }
}

impl fmt::Display for SpaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user holding one or more roles in a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceUser {
    /// User GUID; identity for de-duplication
    pub guid: String,
    /// Username; the notification address
    pub username: String,
    /// Roles held in the space
    pub roles: BTreeSet<SpaceRole>,
}

impl SpaceUser {
    /// Create a user holding a single role.
    pub fn new(guid: impl Into<String>, username: impl Into<String>, role: SpaceRole) -> Self {
        Self {
            guid: guid.into(),
            username: username.into(),
            roles: BTreeSet::from([role]),
        }
    }

    /// Whether any held role qualifies the user as an owner.
    pub fn is_owner(&self) -> bool {
        self.roles.iter().any(|role| role.is_owner())
    }

    /// Whether the username parses as an email address.
    pub fn has_valid_email(&self) -> bool {
        self.username.parse::<lettre::Address>().is_ok()
    }
}

/// An app whose current droplet predates an update of one of its buildpacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedApp {
    /// The app
    pub app: App,
    /// Name of the buildpack that changed after the droplet was built
    pub buildpack: String,
}

/// App as presented in a notification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSummary {
    /// App GUID
    pub guid: String,
    /// App name
    pub name: String,
    /// Space name
    pub space_name: String,
    /// Organization name
    pub org_name: String,
}

impl AppSummary {
    /// Summarise `app` in the context of `space`.
    pub fn new(app: &App, space: &SpaceInfo) -> Self {
        Self {
            guid: app.guid.clone(),
            name: app.name.clone(),
            space_name: space.name.clone(),
            org_name: space.org_name.clone(),
        }
    }
}
