use buildpack_notify::config::PlatformConfig;
use buildpack_notify::core::FetchError;
use buildpack_notify::models::SpaceRole;
use buildpack_notify::platform::{CfClient, PlatformApi};

use crate::common::{CLIENT_ID, CLIENT_SECRET, FakeCloudFoundry};

fn platform_config(api: &FakeCloudFoundry, secret: &str) -> PlatformConfig {
    PlatformConfig {
        api_address: api.base.clone(),
        client_id: CLIENT_ID.to_string(),
        client_secret: secret.to_string(),
        skip_ssl_validation: false,
    }
}

#[tokio::test]
async fn test_client_credentials_exchange() {
    let api = FakeCloudFoundry::start().await;
    let client = CfClient::connect(&platform_config(&api, CLIENT_SECRET)).await.unwrap();
    assert_eq!(client.api_address(), api.base);
}

#[tokio::test]
async fn test_rejected_credentials_are_an_auth_error() {
    let api = FakeCloudFoundry::start().await;
    let err = CfClient::connect(&platform_config(&api, "wrong")).await.err().unwrap();
    assert!(matches!(err, FetchError::Auth { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_v3_listing_follows_absolute_next_links() {
    let api = FakeCloudFoundry::start().await;
    let client = CfClient::connect(&platform_config(&api, CLIENT_SECRET)).await.unwrap();

    let apps = client.list_apps().await.unwrap();

    let names: Vec<_> = apps.iter().map(|app| app.name.as_str()).collect();
    assert_eq!(names, vec!["my-drupal-app", "stopped-app", "restaged-app"]);
    assert_eq!(
        api.requests(),
        vec!["/v3/apps?per_page=100", "/v3/apps?page=2&per_page=100"]
    );
}

#[tokio::test]
async fn test_v2_role_listing_follows_relative_next_url() {
    let api = FakeCloudFoundry::start().await;
    let client = CfClient::connect(&platform_config(&api, CLIENT_SECRET)).await.unwrap();

    let developers = client
        .list_space_roles("space-1", SpaceRole::Developer)
        .await
        .unwrap();

    let usernames: Vec<_> = developers.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(usernames, vec!["user1@example.com", "admin"]);
    assert!(developers.iter().all(|user| user.roles.contains(&SpaceRole::Developer)));
}

#[tokio::test]
async fn test_space_includes_organization_name() {
    let api = FakeCloudFoundry::start().await;
    let client = CfClient::connect(&platform_config(&api, CLIENT_SECRET)).await.unwrap();

    let space = client.get_space("space-1").await.unwrap();
    assert_eq!(space.name, "dev");
    assert_eq!(space.org_name, "sandbox");
}

#[tokio::test]
async fn test_current_droplets() {
    let api = FakeCloudFoundry::start().await;
    let client = CfClient::connect(&platform_config(&api, CLIENT_SECRET)).await.unwrap();

    let droplets = client.list_current_droplets("app-1").await.unwrap();
    assert_eq!(droplets.len(), 1);
    assert_eq!(droplets[0].created_at, "2016-03-01T00:00:00Z");
    assert_eq!(droplets[0].buildpacks[0].name, "python_buildpack");

    assert!(client.list_current_droplets("app-2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let api = FakeCloudFoundry::start().await;
    api.fail_path("/v3/buildpacks");
    let client = CfClient::connect(&platform_config(&api, CLIENT_SECRET)).await.unwrap();

    let err = client.list_buildpacks().await.unwrap_err();
    match err {
        FetchError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream failure");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_api_is_a_request_error() {
    let config = PlatformConfig {
        api_address: "http://127.0.0.1:9".to_string(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        skip_ssl_validation: false,
    };
    let err = CfClient::connect(&config).await.err().unwrap();
    assert!(matches!(err, FetchError::Request { .. }), "unexpected error: {err:?}");
}
