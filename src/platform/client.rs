//! HTTP implementation of [`PlatformApi`] over reqwest.
//!
//! Authentication uses the OAuth2 client-credentials grant: the token endpoint
//! is discovered from `GET /v2/info`, a bearer token is requested once when the
//! client connects, and it is attached to every later request. A run lasts
//! minutes while client tokens are valid for hours, so the token is not
//! refreshed.

use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::PlatformApi;
use super::pagination::{PageSource, V2Page, V3Page, fetch_all};
use crate::config::PlatformConfig;
use crate::constants::{ERROR_BODY_LIMIT, REQUEST_TIMEOUT, V2_RESULTS_PER_PAGE, V3_PER_PAGE};
use crate::core::FetchError;
use crate::models::{App, Buildpack, Droplet, SpaceInfo, SpaceRole, SpaceUser};

/// Authenticated Cloud Foundry API client.
pub struct CfClient {
    http: reqwest::Client,
    api: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserEntity {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpaceResource {
    guid: String,
    name: String,
    #[serde(default)]
    included: SpaceIncluded,
}

#[derive(Debug, Default, Deserialize)]
struct SpaceIncluded {
    #[serde(default)]
    organizations: Vec<OrganizationResource>,
}

#[derive(Debug, Deserialize)]
struct OrganizationResource {
    name: String,
}

impl CfClient {
    /// Build the HTTP client and exchange client credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built and
    /// [`FetchError::Auth`] (or a request error) if the token exchange fails.
    pub async fn connect(config: &PlatformConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.skip_ssl_validation)
            .build()
            .map_err(|source| FetchError::Client { source })?;

        let api = config.api_address.trim_end_matches('/').to_string();
        let token = request_token(&http, &api, &config.client_id, &config.client_secret).await?;
        info!(api = %api, "authenticated against platform API");

        Ok(Self { http, api, token })
    }

    /// API root this client talks to.
    pub fn api_address(&self) -> &str {
        &self.api
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let body = self.get_body(path).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

impl PageSource for CfClient {
    async fn get_body(&self, path: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.api, path);
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Request {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| FetchError::Request {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: truncate(body),
            });
        }
        Ok(body)
    }
}

impl PlatformApi for CfClient {
    async fn list_apps(&self) -> Result<Vec<App>, FetchError> {
        fetch_all::<V3Page<App>, _>(self, &format!("/v3/apps?per_page={V3_PER_PAGE}")).await
    }

    async fn list_buildpacks(&self) -> Result<Vec<Buildpack>, FetchError> {
        fetch_all::<V3Page<Buildpack>, _>(self, &format!("/v3/buildpacks?per_page={V3_PER_PAGE}"))
            .await
    }

    async fn list_current_droplets(&self, app_guid: &str) -> Result<Vec<Droplet>, FetchError> {
        let path = format!("/v3/apps/{app_guid}/droplets?current=true&per_page={V3_PER_PAGE}");
        fetch_all::<V3Page<Droplet>, _>(self, &path).await
    }

    async fn list_space_roles(
        &self,
        space_guid: &str,
        role: SpaceRole,
    ) -> Result<Vec<SpaceUser>, FetchError> {
        let path = format!(
            "/v2/spaces/{space_guid}/{}?results-per-page={V2_RESULTS_PER_PAGE}",
            role.collection()
        );
        let resources = fetch_all::<V2Page<UserEntity>, _>(self, &path).await?;

        Ok(resources
            .into_iter()
            .map(|resource| {
                SpaceUser::new(
                    resource.metadata.guid,
                    resource.entity.username.unwrap_or_default(),
                    role,
                )
            })
            .collect())
    }

    async fn get_space(&self, space_guid: &str) -> Result<SpaceInfo, FetchError> {
        let space: SpaceResource = self
            .get_json(&format!("/v3/spaces/{space_guid}?include=organization"))
            .await?;

        let org_name = space
            .included
            .organizations
            .into_iter()
            .next()
            .map(|org| org.name)
            .unwrap_or_default();

        Ok(SpaceInfo {
            guid: space.guid,
            name: space.name,
            org_name,
        })
    }
}

async fn request_token(
    http: &reqwest::Client,
    api: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, FetchError> {
    let info_url = format!("{api}/v2/info");
    let response = http
        .get(&info_url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| FetchError::Request {
            path: info_url.clone(),
            source,
        })?;
    let status = response.status();
    let body = response.text().await.map_err(|source| FetchError::Request {
        path: info_url.clone(),
        source,
    })?;
    if !status.is_success() {
        return Err(FetchError::Status {
            path: info_url,
            status: status.as_u16(),
            body: truncate(body),
        });
    }
    let info: InfoResponse = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
        path: info_url.clone(),
        source,
    })?;

    let endpoint = format!("{}/oauth/token", info.token_endpoint.trim_end_matches('/'));
    debug!(endpoint = %endpoint, "requesting client-credentials token");

    let response = http
        .post(&endpoint)
        .basic_auth(client_id, Some(client_secret))
        .header(ACCEPT, "application/json")
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|source| FetchError::Request {
            path: endpoint.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Auth {
            endpoint,
            reason: format!("HTTP {}", status.as_u16()),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Request {
        path: endpoint.clone(),
        source,
    })?;
    let token: TokenResponse = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
        path: endpoint.clone(),
        source,
    })?;

    if token.access_token.is_empty() {
        return Err(FetchError::Auth {
            endpoint,
            reason: "response carried no access_token".to_string(),
        });
    }
    Ok(token.access_token)
}

fn truncate(mut body: String) -> String {
    if body.len() > ERROR_BODY_LIMIT {
        let mut end = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
