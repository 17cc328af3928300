//! Email body rendering with Tera.
//!
//! Templates are plain-text files under a template directory. The notify
//! template lives at `mail/notify.tmpl` and receives a [`NotifyEmail`] as its
//! context:
//!
//! - `username`: the recipient
//! - `apps`: list of `{guid, name, space_name, org_name}`
//! - `is_multiple_apps`: `true` when `apps` has more than one entry
//! - `updated_buildpacks`: list of `{name, version, url}`
//!
//! `.tmpl` files are not auto-escaped, so the output is suitable for a
//! `text/plain` body.

use serde::Serialize;
use std::path::Path;
use tera::{Context as TeraContext, Tera};
use tracing::debug;

use crate::core::TemplateError;
use crate::models::AppSummary;
use crate::release::BuildpackReleaseInfo;

/// Name under which the notify template is registered.
pub const NOTIFY_TEMPLATE: &str = "mail/notify.tmpl";

/// Context of the notify email.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyEmail {
    /// Recipient username
    pub username: String,
    /// Outdated apps owned by the recipient
    pub apps: Vec<AppSummary>,
    /// Grammatical number of `apps`
    pub is_multiple_apps: bool,
    /// Buildpacks updated since the last run
    pub updated_buildpacks: Vec<BuildpackReleaseInfo>,
}

impl NotifyEmail {
    /// Build the context for `username`, deriving `is_multiple_apps`.
    pub fn new(
        username: impl Into<String>,
        apps: Vec<AppSummary>,
        updated_buildpacks: Vec<BuildpackReleaseInfo>,
    ) -> Self {
        Self {
            username: username.into(),
            is_multiple_apps: apps.len() > 1,
            apps,
            updated_buildpacks,
        }
    }
}

/// Parsed email templates.
#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Load every known template from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Load`] if a template file is missing or does
    /// not parse.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let path = dir.join(NOTIFY_TEMPLATE);
        let mut tera = Tera::default();
        tera.add_template_file(&path, Some(NOTIFY_TEMPLATE))
            .map_err(|source| TemplateError::Load {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "loaded notify template");
        Ok(Self { tera })
    }

    /// Build from template source held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Load`] if `source` does not parse.
    pub fn from_source(notify: &str) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_template(NOTIFY_TEMPLATE, notify)
            .map_err(|source| TemplateError::Load {
                path: NOTIFY_TEMPLATE.into(),
                source,
            })?;
        Ok(Self { tera })
    }

    /// Render the notify email body.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] if the template references data the
    /// context does not provide.
    pub fn render_notify_email(&self, email: &NotifyEmail) -> Result<Vec<u8>, TemplateError> {
        let render = |source| TemplateError::Render {
            name: NOTIFY_TEMPLATE.to_string(),
            source,
        };
        let context = TeraContext::from_serialize(email).map_err(render)?;
        let body = self.tera.render(NOTIFY_TEMPLATE, &context).map_err(render)?;
        Ok(body.into_bytes())
    }
}
