//! Notification dispatch: one email per owner.
//!
//! Delivery is best-effort per recipient. A render or send failure is logged
//! and recorded in the [`DispatchReport`], then the loop moves on; it never
//! fails the run.

use tracing::{error, info};

use crate::constants::SUBJECT_PREFIX;
use crate::mailer::Mailer;
use crate::owners::OwnerMap;
use crate::release::BuildpackReleaseInfo;
use crate::templating::{NotifyEmail, Templates};

/// Result of notifying one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted by the mail transport
    Sent,
    /// Not sent because of dry-run
    Skipped,
    /// Rendering or delivery failed; the message is the error chain
    Failed(String),
}

/// One recipient's notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Recipient username
    pub recipient: String,
    /// Number of apps listed in the email
    pub app_count: usize,
    /// What happened
    pub outcome: DeliveryOutcome,
}

/// Per-recipient outcomes of a dispatch, in owner order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// One entry per recipient
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    /// Recipients whose email was accepted.
    pub fn sent(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeliveryOutcome::Sent))
    }

    /// Recipients skipped by dry-run.
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeliveryOutcome::Skipped))
    }

    /// Recipients whose notification failed.
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeliveryOutcome::Failed(_)))
    }

    /// Recipients in order, regardless of outcome.
    pub fn recipients(&self) -> Vec<&str> {
        self.deliveries
            .iter()
            .map(|delivery| delivery.recipient.as_str())
            .collect()
    }

    fn count(&self, predicate: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| predicate(&delivery.outcome))
            .count()
    }
}

/// Email subject for a notification listing `app_count` apps.
pub fn subject_for(app_count: usize) -> String {
    if app_count > 1 {
        format!("{SUBJECT_PREFIX} applications")
    } else {
        format!("{SUBJECT_PREFIX} application")
    }
}

/// Render and send one email per owner in `owners`.
///
/// In dry-run mode every email is still rendered, so template problems
/// surface, but `mailer` is never called.
pub async fn send_notify_emails<M: Mailer>(
    owners: &OwnerMap,
    updated_buildpacks: &[BuildpackReleaseInfo],
    templates: &Templates,
    mailer: &M,
    dry_run: bool,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for owner in owners.iter() {
        let app_count = owner.apps.len();
        let subject = subject_for(app_count);
        let email = NotifyEmail::new(
            owner.username.clone(),
            owner.apps.clone(),
            updated_buildpacks.to_vec(),
        );

        let outcome = match templates.render_notify_email(&email) {
            Err(err) => {
                let err = anyhow::Error::from(err);
                error!(
                    recipient = %owner.username,
                    error = %format!("{err:#}"),
                    "unable to render notification"
                );
                DeliveryOutcome::Failed(format!("{err:#}"))
            }
            Ok(_) if dry_run => {
                info!(
                    recipient = %owner.username,
                    apps = app_count,
                    subject = %subject,
                    "would send notification"
                );
                DeliveryOutcome::Skipped
            }
            Ok(body) => match mailer.send_email(&owner.username, &subject, &body).await {
                Ok(()) => {
                    info!(recipient = %owner.username, apps = app_count, "sent notification");
                    DeliveryOutcome::Sent
                }
                Err(err) => {
                    let err = anyhow::Error::from(err);
                    error!(
                        recipient = %owner.username,
                        error = %format!("{err:#}"),
                        "unable to send notification"
                    );
                    DeliveryOutcome::Failed(format!("{err:#}"))
                }
            },
        };

        report.deliveries.push(Delivery {
            recipient: owner.username.clone(),
            app_count,
            outcome,
        });
    }

    report
}
