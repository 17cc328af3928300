//! Narrow interface to the Cloud Foundry platform API.
//!
//! The detection and owner-resolution stages only depend on [`PlatformApi`],
//! never on HTTP details, so they can be exercised against in-process fakes.
//! [`CfClient`] is the production implementation.

pub mod client;
pub mod pagination;

pub use client::CfClient;
pub use pagination::{Page, PageSource, V2Page, V3Page, fetch_all};

use crate::core::FetchError;
use crate::models::{App, Buildpack, Droplet, SpaceInfo, SpaceRole, SpaceUser};

/// Read-only queries the notification run needs from the platform.
///
/// Every listing is complete (all pages followed) or an error.
#[allow(async_fn_in_trait)]
pub trait PlatformApi {
    /// Every app visible to the client, in API order.
    async fn list_apps(&self) -> Result<Vec<App>, FetchError>;

    /// Every buildpack installed on the platform, in API order.
    async fn list_buildpacks(&self) -> Result<Vec<Buildpack>, FetchError>;

    /// Droplets of `app_guid` flagged as current. A consistent platform returns
    /// exactly one; callers treat zero or several as undeterminable.
    async fn list_current_droplets(&self, app_guid: &str) -> Result<Vec<Droplet>, FetchError>;

    /// Users holding `role` in `space_guid`. Each returned user carries `role`.
    async fn list_space_roles(
        &self,
        space_guid: &str,
        role: SpaceRole,
    ) -> Result<Vec<SpaceUser>, FetchError>;

    /// Space and organization names for `space_guid`.
    async fn get_space(&self, space_guid: &str) -> Result<SpaceInfo, FetchError>;
}
