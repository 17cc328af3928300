use std::collections::HashMap;
use std::path::PathBuf;

use buildpack_notify::config::PlatformConfig;
use buildpack_notify::freshness::{FreshnessStore, MemoryStore, SqliteStore};
use buildpack_notify::models::SpaceRole;
use buildpack_notify::notify::DeliveryOutcome;
use buildpack_notify::pipeline::{NotifyJob, RunSummary};
use buildpack_notify::platform::CfClient;
use buildpack_notify::templating::Templates;
use buildpack_notify::test_utils::fixtures::{app, buildpack, droplet, space};
use buildpack_notify::test_utils::{FakePlatform, RecordingMailer, init_test_logging};
use tempfile::TempDir;

use crate::common::{CLIENT_ID, CLIENT_SECRET, FakeCloudFoundry};

fn templates() -> Templates {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
    Templates::load(&dir).unwrap()
}

async fn run(
    platform: &FakePlatform,
    mailer: &RecordingMailer,
    store: &mut dyn FreshnessStore,
    dry_run: bool,
) -> RunSummary {
    let templates = templates();
    NotifyJob {
        platform,
        mailer,
        templates: &templates,
        store,
        dry_run,
    }
    .run()
    .await
    .unwrap()
}

/// One python app in `space-1`, staged 2016-03-01, with two managers.
fn drupal_platform() -> FakePlatform {
    FakePlatform::default()
        .with_buildpack(buildpack("bp-1", "python_buildpack", "2016-06-08T16:41:45Z"))
        .with_app(app("app-1", "my-drupal-app", "space-1"))
        .with_droplet("app-1", droplet("d-1", "2016-03-01T00:00:00Z", &["python_buildpack"]))
        .with_space(space("space-1", "dev", "sandbox"))
        .with_role("space-1", SpaceRole::Manager, "u-1", "user1@example.com")
        .with_role("space-1", SpaceRole::Manager, "u-2", "user2@example.com")
}

#[tokio::test]
async fn test_buildpack_updated_after_stored_record_is_processed() {
    init_test_logging(None);
    let platform = drupal_platform();
    let mailer = RecordingMailer::default();
    let mut store = MemoryStore::with_records(HashMap::from([(
        "bp-1".to_string(),
        "2016-01-01T00:00:00Z".to_string(),
    )]));

    let summary = run(&platform, &mailer, &mut store, false).await;

    assert_eq!(summary.fresh_buildpacks, vec!["python_buildpack"]);
    assert_eq!(summary.outdated_apps, vec!["my-drupal-app"]);
    assert_eq!(store.load().unwrap()["bp-1"], "2016-06-08T16:41:45Z");
}

#[tokio::test]
async fn test_buildpack_equal_to_stored_record_is_skipped() {
    let platform = drupal_platform();
    let mailer = RecordingMailer::default();
    let mut store = MemoryStore::with_records(HashMap::from([(
        "bp-1".to_string(),
        "2016-06-08T16:41:45Z".to_string(),
    )]));

    let summary = run(&platform, &mailer, &mut store, false).await;

    assert_eq!(summary, RunSummary::default());
    assert!(mailer.sent().is_empty());
    assert_eq!(platform.app_requests(), 0);
}

#[tokio::test]
async fn test_droplet_staged_after_update_is_not_flagged() {
    let platform = FakePlatform::default()
        .with_buildpack(buildpack("bp-1", "python_buildpack", "2016-06-08T16:41:45Z"))
        .with_app(app("app-1", "my-drupal-app", "space-1"))
        .with_droplet("app-1", droplet("d-1", "2016-07-01T00:00:00Z", &["python_buildpack"]))
        .with_space(space("space-1", "dev", "sandbox"))
        .with_role("space-1", SpaceRole::Manager, "u-1", "user1@example.com");
    let mailer = RecordingMailer::default();
    let mut store = MemoryStore::default();

    let summary = run(&platform, &mailer, &mut store, false).await;

    assert!(summary.outdated_apps.is_empty());
    assert!(mailer.sent().is_empty());
    // The buildpack is still recorded so the next run does not re-check it.
    assert_eq!(summary.recorded, 1);
}

#[tokio::test]
async fn test_each_owner_gets_one_email() {
    let platform = drupal_platform();
    let mailer = RecordingMailer::default();
    let mut store = MemoryStore::default();

    let summary = run(&platform, &mailer, &mut store, false).await;

    let sent = mailer.sent();
    let mut recipients: Vec<_> = sent.iter().map(|email| email.recipient.as_str()).collect();
    recipients.sort_unstable();
    assert_eq!(recipients, vec!["user1@example.com", "user2@example.com"]);
    assert_eq!(summary.report.sent(), 2);

    for email in &sent {
        assert_eq!(email.subject, "Action required: restage your application");
        assert!(email.body.contains(&format!("Hello {},", email.recipient)));
        assert!(
            email
                .body
                .contains("  - my-drupal-app (organization: sandbox, space: dev)")
        );
        assert!(email.body.contains("  - python_buildpack"));
    }
}

#[tokio::test]
async fn test_owner_of_several_apps_gets_a_single_email() {
    let platform = drupal_platform()
        .with_app(app("app-2", "my-wordpress-app", "space-1"))
        .with_droplet("app-2", droplet("d-2", "2016-02-01T00:00:00Z", &["python_buildpack"]));
    let mailer = RecordingMailer::default();
    let mut store = MemoryStore::default();

    run(&platform, &mailer, &mut store, false).await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    for email in &sent {
        assert_eq!(email.subject, "Action required: restage your applications");
        assert!(email.body.contains("following cloud.gov applications:"));
        assert!(email.body.contains("my-drupal-app"));
        assert!(email.body.contains("my-wordpress-app"));
    }
}

#[tokio::test]
async fn test_delivery_failure_does_not_stop_other_recipients() {
    let platform = drupal_platform();
    let mailer = RecordingMailer::default().failing_for("user1@example.com");
    let mut store = MemoryStore::default();

    let summary = run(&platform, &mailer, &mut store, false).await;

    assert_eq!(summary.report.sent(), 1);
    assert_eq!(summary.report.failed(), 1);
    assert_eq!(mailer.sent()[0].recipient, "user2@example.com");
    assert_eq!(summary.recorded, 1);
}

#[tokio::test]
async fn test_dry_run_matches_live_run_without_side_effects() {
    let live_platform = drupal_platform();
    let live_mailer = RecordingMailer::default();
    let mut live_store = MemoryStore::default();
    let live = run(&live_platform, &live_mailer, &mut live_store, false).await;

    let dry_platform = drupal_platform();
    let dry_mailer = RecordingMailer::default();
    let mut dry_store = MemoryStore::default();
    let dry = run(&dry_platform, &dry_mailer, &mut dry_store, true).await;

    assert_eq!(dry.fresh_buildpacks, live.fresh_buildpacks);
    assert_eq!(dry.outdated_apps, live.outdated_apps);
    assert_eq!(dry.report.recipients(), live.report.recipients());
    assert!(
        dry.report
            .deliveries
            .iter()
            .all(|delivery| delivery.outcome == DeliveryOutcome::Skipped)
    );
    assert!(dry_mailer.sent().is_empty());
    assert_eq!(dry.recorded, 0);
    assert!(dry_store.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_end_to_end_against_fake_api() {
    let api = FakeCloudFoundry::start().await;
    let platform = CfClient::connect(&PlatformConfig {
        api_address: api.base.clone(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        skip_ssl_validation: false,
    })
    .await
    .unwrap();

    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("notify.db");
    let mut store = SqliteStore::open(&db_path).unwrap();
    let mailer = RecordingMailer::default();
    let templates = templates();

    let summary = NotifyJob {
        platform: &platform,
        mailer: &mailer,
        templates: &templates,
        store: &mut store,
        dry_run: false,
    }
    .run()
    .await
    .unwrap();

    assert_eq!(summary.outdated_apps, vec!["my-drupal-app"]);
    assert_eq!(summary.recorded, 2);

    let sent = mailer.sent();
    let mut recipients: Vec<_> = sent.iter().map(|email| email.recipient.as_str()).collect();
    recipients.sort_unstable();
    assert_eq!(recipients, vec!["manager@example.com", "user1@example.com"]);
    assert!(sent[0].body.contains(
        "  - python_buildpack v1.7.43 (https://github.com/cloudfoundry/python-buildpack/releases/tag/v1.7.43)"
    ));

    // Stopped apps are never asked for droplets.
    let requests = api.requests();
    assert!(!requests.iter().any(|path| path.starts_with("/v3/apps/app-2/")));

    // A second run over the persisted records has nothing to do.
    drop(store);
    let mut reopened = SqliteStore::open(&db_path).unwrap();
    let second = NotifyJob {
        platform: &platform,
        mailer: &mailer,
        templates: &templates,
        store: &mut reopened,
        dry_run: false,
    }
    .run()
    .await
    .unwrap();
    assert!(second.fresh_buildpacks.is_empty());
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn test_api_failure_aborts_without_recording() {
    let api = FakeCloudFoundry::start().await;
    api.fail_path("/v3/apps");
    let platform = CfClient::connect(&PlatformConfig {
        api_address: api.base.clone(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        skip_ssl_validation: false,
    })
    .await
    .unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mailer = RecordingMailer::default();
    let templates = templates();

    let result = NotifyJob {
        platform: &platform,
        mailer: &mailer,
        templates: &templates,
        store: &mut store,
        dry_run: false,
    }
    .run()
    .await;

    assert!(result.is_err());
    assert!(store.load().unwrap().is_empty());
    assert!(mailer.sent().is_empty());
}
