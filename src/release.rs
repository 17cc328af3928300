//! Release metadata for system buildpacks.
//!
//! Emails link each updated buildpack to its upstream release notes. The
//! link is derived from the buildpack name (system buildpacks live at
//! `github.com/cloudfoundry/<name>-buildpack`) and the version embedded in
//! the uploaded package filename.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::models::Buildpack;

const SYSTEM_BUILDPACKS: &[(&str, &str)] = &[
    ("staticfile_buildpack", "https://github.com/cloudfoundry/staticfile-buildpack/releases"),
    ("java_buildpack", "https://github.com/cloudfoundry/java-buildpack/releases"),
    ("ruby_buildpack", "https://github.com/cloudfoundry/ruby-buildpack/releases"),
    ("dotnet_core_buildpack", "https://github.com/cloudfoundry/dotnet-core-buildpack/releases"),
    ("nodejs_buildpack", "https://github.com/cloudfoundry/nodejs-buildpack/releases"),
    ("go_buildpack", "https://github.com/cloudfoundry/go-buildpack/releases"),
    ("python_buildpack", "https://github.com/cloudfoundry/python-buildpack/releases"),
    ("php_buildpack", "https://github.com/cloudfoundry/php-buildpack/releases"),
    ("binary_buildpack", "https://github.com/cloudfoundry/binary-buildpack/releases"),
    ("nginx_buildpack", "https://github.com/cloudfoundry/nginx-buildpack/releases"),
    ("r_buildpack", "https://github.com/cloudfoundry/r-buildpack/releases"),
];

fn filename_version() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"-(v\d+(?:\.\d+)*)\.zip$").ok())
        .as_ref()
}

fn tag_version() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^v\d+(?:\.\d+)*$").ok())
        .as_ref()
}

/// Releases page of a system buildpack; `None` for custom buildpacks.
pub fn release_url(name: &str) -> Option<&'static str> {
    SYSTEM_BUILDPACKS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, url)| *url)
}

/// Version embedded in a buildpack package filename.
///
/// `python_buildpack-cflinuxfs3-v1.7.43.zip` yields `v1.7.43`.
pub fn parse_version(filename: &str) -> Option<String> {
    filename_version()?
        .captures(filename)
        .and_then(|captures| captures.get(1))
        .map(|version| version.as_str().to_string())
}

/// Link to the tag page of `version`, or the releases page when `version` is
/// not a `v`-prefixed dotted number.
pub fn version_url(release_url: &str, version: &str) -> String {
    if tag_version().is_some_and(|pattern| pattern.is_match(version)) {
        format!("{release_url}/tag/{version}")
    } else {
        release_url.to_string()
    }
}

/// An updated buildpack as presented in a notification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildpackReleaseInfo {
    /// Buildpack name
    pub name: String,
    /// Parsed version, empty when the filename carries none
    pub version: String,
    /// Release notes link, empty for custom buildpacks
    pub url: String,
}

impl BuildpackReleaseInfo {
    /// Derive release information from an installed buildpack.
    pub fn from_buildpack(buildpack: &Buildpack) -> Self {
        let version = buildpack
            .filename
            .as_deref()
            .and_then(parse_version)
            .unwrap_or_default();
        let url = release_url(&buildpack.name)
            .map(|releases| version_url(releases, &version))
            .unwrap_or_default();

        Self {
            name: buildpack.name.clone(),
            version,
            url,
        }
    }
}
