//! Owner resolution: from outdated apps to the users who should hear about them.
//!
//! For every flagged app the owning space's developers and managers are
//! fetched (once per space per run), merged by user GUID, filtered to
//! email-shaped usernames and then inverted into a username → apps map.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::core::NotifyError;
use crate::models::{AppSummary, OutdatedApp, SpaceInfo, SpaceRole, SpaceUser};
use crate::platform::PlatformApi;

/// A notification recipient and the apps they own, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    /// Username (email address)
    pub username: String,
    /// Outdated apps, each at most once
    pub apps: Vec<AppSummary>,
}

/// Finalised username → apps mapping, ordered by first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerMap {
    owners: Vec<Owner>,
}

impl OwnerMap {
    /// Iterate recipients in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &Owner> {
        self.owners.iter()
    }

    /// Apps owned by `username`.
    pub fn get(&self, username: &str) -> Option<&[AppSummary]> {
        self.owners
            .iter()
            .find(|owner| owner.username == username)
            .map(|owner| owner.apps.as_slice())
    }

    /// Number of recipients.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether there are no recipients.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Accumulates (username, app) pairs into an [`OwnerMap`].
#[derive(Debug, Default)]
pub struct OwnerMapBuilder {
    owners: Vec<Owner>,
    index: HashMap<String, usize>,
}

impl OwnerMapBuilder {
    /// Append `app` to `username`'s list unless it is already there.
    pub fn add(&mut self, username: &str, app: AppSummary) {
        let position = match self.index.get(username) {
            Some(&position) => position,
            None => {
                self.owners.push(Owner {
                    username: username.to_string(),
                    apps: Vec::new(),
                });
                let position = self.owners.len() - 1;
                self.index.insert(username.to_string(), position);
                position
            }
        };

        let apps = &mut self.owners[position].apps;
        if !apps.iter().any(|existing| existing.guid == app.guid) {
            apps.push(app);
        }
    }

    /// Finish building.
    pub fn build(self) -> OwnerMap {
        OwnerMap {
            owners: self.owners,
        }
    }
}

/// Qualifying users of one space, plus the space's display names.
#[derive(Debug, Clone)]
struct SpaceOwners {
    space: SpaceInfo,
    users: Vec<SpaceUser>,
}

/// Resolves outdated apps to owners, caching space lookups for its lifetime.
pub struct OwnerResolver<'a, P> {
    platform: &'a P,
    spaces: HashMap<String, SpaceOwners>,
}

impl<'a, P: PlatformApi> OwnerResolver<'a, P> {
    /// Create a resolver with an empty space cache.
    pub fn new(platform: &'a P) -> Self {
        Self {
            platform,
            spaces: HashMap::new(),
        }
    }

    /// Build the owner map for `apps`.
    ///
    /// Each call produces a new map; only space lookups are reused, so
    /// resolving the same input twice yields the same result.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Fetch`] if a space or role listing fails.
    pub async fn resolve(&mut self, apps: &[OutdatedApp]) -> Result<OwnerMap, NotifyError> {
        let mut builder = OwnerMapBuilder::default();

        for outdated in apps {
            let app = &outdated.app;
            let Some(space_guid) = app.space_guid() else {
                warn!(app = %app.name, guid = %app.guid, "app has no space; skipping");
                continue;
            };

            let owners = self.space_owners(space_guid).await?;
            let summary = AppSummary::new(app, &owners.space);

            let mut notified = 0usize;
            for user in &owners.users {
                if !user.has_valid_email() {
                    warn!(
                        app = %app.name,
                        space = %owners.space.name,
                        username = %user.username,
                        "dropping owner without a valid email address"
                    );
                    continue;
                }
                builder.add(&user.username, summary.clone());
                notified += 1;
            }

            if notified == 0 {
                warn!(app = %app.name, space = %owners.space.name, "no notifiable owners for app");
            }
        }

        Ok(builder.build())
    }

    /// Number of spaces looked up so far.
    pub fn cached_spaces(&self) -> usize {
        self.spaces.len()
    }

    async fn space_owners(&mut self, space_guid: &str) -> Result<&SpaceOwners, NotifyError> {
        if !self.spaces.contains_key(space_guid) {
            let owners = fetch_space_owners(self.platform, space_guid).await?;
            self.spaces.insert(space_guid.to_string(), owners);
        }
        Ok(&self.spaces[space_guid])
    }
}

async fn fetch_space_owners<P: PlatformApi>(
    platform: &P,
    space_guid: &str,
) -> Result<SpaceOwners, NotifyError> {
    let space = platform.get_space(space_guid).await?;

    let mut users: Vec<SpaceUser> = Vec::new();
    for role in SpaceRole::OWNERS {
        for user in platform.list_space_roles(space_guid, role).await? {
            merge_user(&mut users, user);
        }
    }
    users.retain(SpaceUser::is_owner);

    debug!(space = %space.name, owners = users.len(), "resolved space owners");
    Ok(SpaceOwners { space, users })
}

/// Add `user` to `users`, folding roles into an existing entry with the same GUID.
fn merge_user(users: &mut Vec<SpaceUser>, user: SpaceUser) {
    match users.iter_mut().find(|existing| existing.guid == user.guid) {
        Some(existing) => existing.roles.extend(user.roles),
        None => users.push(user),
    }
}
