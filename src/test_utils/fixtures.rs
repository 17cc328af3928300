//! Constructors for platform resources used across tests.

use crate::models::{
    App, AppRelationships, AppState, Buildpack, Droplet, DropletBuildpack, Lifecycle,
    LifecycleData, OutdatedApp, RelationshipData, SpaceInfo, ToOneRelationship,
};

/// A started buildpack app in `space_guid`.
pub fn app(guid: &str, name: &str, space_guid: &str) -> App {
    App {
        guid: guid.to_string(),
        name: name.to_string(),
        state: AppState::Started,
        created_at: "2016-01-01T00:00:00Z".to_string(),
        updated_at: "2016-01-01T00:00:00Z".to_string(),
        lifecycle: Lifecycle {
            kind: "buildpack".to_string(),
            data: LifecycleData {
                buildpacks: Vec::new(),
                stack: Some("cflinuxfs3".to_string()),
            },
        },
        relationships: AppRelationships {
            space: ToOneRelationship {
                data: Some(RelationshipData {
                    guid: space_guid.to_string(),
                }),
            },
        },
    }
}

/// An installed buildpack last updated at `updated_at`.
pub fn buildpack(guid: &str, name: &str, updated_at: &str) -> Buildpack {
    Buildpack {
        guid: guid.to_string(),
        name: name.to_string(),
        stack: Some("cflinuxfs3".to_string()),
        filename: None,
        created_at: "2015-01-01T00:00:00Z".to_string(),
        updated_at: updated_at.to_string(),
    }
}

/// A staged droplet built at `created_at` by `buildpacks`, in detection order.
pub fn droplet(guid: &str, created_at: &str, buildpacks: &[&str]) -> Droplet {
    Droplet {
        guid: guid.to_string(),
        state: "STAGED".to_string(),
        error: None,
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
        buildpacks: buildpacks
            .iter()
            .map(|name| DropletBuildpack {
                name: name.to_string(),
                detect_output: None,
                buildpack_name: None,
                version: None,
            })
            .collect(),
    }
}

/// A space in organization `org_name`.
pub fn space(guid: &str, name: &str, org_name: &str) -> SpaceInfo {
    SpaceInfo {
        guid: guid.to_string(),
        name: name.to_string(),
        org_name: org_name.to_string(),
    }
}

/// `app` flagged because of `buildpack`.
pub fn outdated(app: App, buildpack: &str) -> OutdatedApp {
    OutdatedApp {
        app,
        buildpack: buildpack.to_string(),
    }
}
