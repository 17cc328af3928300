//! Paginated resource fetching.
//!
//! Cloud Foundry list endpoints return one page per request together with a
//! link to the next page. Two envelope shapes exist:
//!
//! - V3: `{"pagination": {"next": {"href": "https://api.../v3/apps?page=2"}}, "resources": [...]}`
//!   where `next` is `null` on the last page
//! - V2: `{"next_url": "/v2/spaces/.../developers?page=2", "resources": [{"metadata": ..., "entity": ...}]}`
//!   where `next_url` is `null` on the last page
//!
//! [`fetch_all`] follows links until the envelope reports no next page and
//! returns every item in server order. It is fail-fast: a request or decode
//! failure on any page discards what was accumulated.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::debug;

use crate::core::FetchError;

/// A single page of a list endpoint.
pub trait Page: DeserializeOwned {
    /// Resource type carried by the page.
    type Item;

    /// Split the page into its items and the raw next-page link, if any.
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

/// Something that can fetch a response body for an API path.
///
/// [`crate::platform::CfClient`] implements this over HTTP; tests implement it
/// over canned bodies.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// Fetch the body of `path` (path and query, relative to the API root).
    async fn get_body(&self, path: &str) -> Result<String, FetchError>;
}

/// V3 page envelope.
#[derive(Debug, Deserialize)]
pub struct V3Page<T> {
    /// Pagination block
    #[serde(default)]
    pub pagination: V3Pagination,
    /// Items on this page
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

/// V3 pagination block.
#[derive(Debug, Default, Deserialize)]
pub struct V3Pagination {
    /// Total number of results across all pages
    #[serde(default)]
    pub total_results: u64,
    /// Total number of pages
    #[serde(default)]
    pub total_pages: u64,
    /// Link to the next page; `null` on the last page
    #[serde(default)]
    pub next: Option<Link>,
}

/// A V3 link object.
#[derive(Debug, Deserialize)]
pub struct Link {
    /// Absolute URL
    #[serde(default)]
    pub href: String,
}

impl<T: DeserializeOwned> Page for V3Page<T> {
    type Item = T;

    fn into_parts(self) -> (Vec<T>, Option<String>) {
        let next = self.pagination.next.map(|link| link.href);
        (self.resources, next)
    }
}

/// V2 page envelope.
#[derive(Debug, Deserialize)]
pub struct V2Page<T> {
    /// Total number of results across all pages
    #[serde(default)]
    pub total_results: u64,
    /// Relative link to the next page; `null` on the last page
    #[serde(default)]
    pub next_url: Option<String>,
    /// Items on this page
    #[serde(default = "Vec::new")]
    pub resources: Vec<V2Resource<T>>,
}

/// A V2 resource: metadata plus entity.
#[derive(Debug, Deserialize)]
pub struct V2Resource<T> {
    /// Resource metadata
    pub metadata: V2Metadata,
    /// Resource body
    pub entity: T,
}

/// Metadata of a V2 resource.
#[derive(Debug, Deserialize)]
pub struct V2Metadata {
    /// Resource GUID
    pub guid: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl<T: DeserializeOwned> Page for V2Page<T> {
    type Item = V2Resource<T>;

    fn into_parts(self) -> (Vec<V2Resource<T>>, Option<String>) {
        (self.resources, self.next_url)
    }
}

/// Fetch every page starting at `start` and return all items in server order.
///
/// # Errors
///
/// Returns the first [`FetchError`] from any page request, a
/// [`FetchError::Decode`] when a page does not match `P`, a
/// [`FetchError::InvalidLink`] for an unusable next link, and a
/// [`FetchError::PaginationLoop`] when a link revisits a fetched page.
/// Items accumulated before the failure are dropped.
pub async fn fetch_all<P, S>(source: &S, start: &str) -> Result<Vec<P::Item>, FetchError>
where
    P: Page,
    S: PageSource,
{
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(start.to_string());

    while let Some(path) = next.take() {
        if !visited.insert(path.clone()) {
            return Err(FetchError::PaginationLoop { path });
        }

        let body = source.get_body(&path).await?;
        let page: P = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            path: path.clone(),
            source,
        })?;

        let (resources, link) = page.into_parts();
        debug!(path = %path, count = resources.len(), "fetched page");
        items.extend(resources);

        next = match link.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(link) => Some(request_path(link)?),
        };
    }

    Ok(items)
}

/// Reduce a next-page link to the path and query to request.
///
/// V2 links are already relative; V3 links are absolute URLs on the API host.
///
/// # Errors
///
/// Returns [`FetchError::InvalidLink`] when the link is neither a relative
/// path nor a parseable absolute URL.
pub fn request_path(link: &str) -> Result<String, FetchError> {
    if link.starts_with('/') {
        return Ok(link.to_string());
    }

    let url = reqwest::Url::parse(link).map_err(|_| FetchError::InvalidLink {
        link: link.to_string(),
    })?;

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    Ok(path)
}
