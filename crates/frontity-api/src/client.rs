// WordPress REST API HTTP client
//
// Wraps `reqwest::Client` with REST route construction (self-hosted
// `wp-json/wp/v2/` vs. WordPress.com `wp/v2/sites/<domain>/`), pagination
// header extraction and error-body decoding. Endpoint helpers live in
// `endpoints.rs` to keep this module focused on transport mechanics.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

const TOTAL_HEADER: &str = "x-wp-total";
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// A decoded REST payload plus the pagination totals WordPress sends
/// alongside collection responses.
#[derive(Debug, Clone)]
pub struct WpResponse<T> {
    pub data: T,
    /// `X-WP-Total`, when present.
    pub total: Option<u64>,
    /// `X-WP-TotalPages`, when present.
    pub total_pages: Option<u64>,
}

/// One hop of a server-side redirection, as seen by a non-following request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub status: u16,
    /// Absolute target (relative `Location` headers are resolved).
    pub location: Url,
}

#[derive(Debug, Deserialize)]
struct WpErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Raw HTTP client for a WordPress REST API root.
///
/// `api` is the API root: `https://site.com/wp-json/` for self-hosted
/// sites or `https://public-api.wordpress.com/wp/v2/sites/site.com/` for
/// WordPress.com. Relative endpoints such as `posts` are resolved against
/// it with the `wp/v2/` namespace where needed.
#[derive(Clone)]
pub struct WpClient {
    http: reqwest::Client,
    api: Url,
    is_wp_com: bool,
    auth: Option<SecretString>,
}

impl std::fmt::Debug for WpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WpClient")
            .field("api", &self.api.as_str())
            .field("is_wp_com", &self.is_wp_com)
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}

impl WpClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(api: Url, is_wp_com: bool, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, api, is_wp_com))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for disabling redirect following if 3xx
    /// answers should surface as [`Error::Redirect`].
    pub fn with_client(http: reqwest::Client, api: Url, is_wp_com: bool) -> Self {
        Self {
            http,
            api: with_final_slash(api),
            is_wp_com,
            auth: None,
        }
    }

    /// Attach a bearer token, sent with every REST request (previews need it).
    pub fn with_auth(mut self, token: SecretString) -> Self {
        self.auth = Some(token);
        self
    }

    /// The API root URL (always ends with `/`).
    pub fn api(&self) -> &Url {
        &self.api
    }

    pub fn is_wp_com(&self) -> bool {
        self.is_wp_com
    }

    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build the full URL for an endpoint.
    ///
    /// - `posts` → `{api}wp/v2/posts` (self-hosted) or `{api}posts` (WordPress.com)
    /// - `/frontity/v1/info` → `{api}frontity/v1/info` (explicit namespace)
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        let relative = if self.is_wp_com {
            endpoint.trim_start_matches('/').to_owned()
        } else if let Some(namespaced) = endpoint.strip_prefix('/') {
            namespaced.to_owned()
        } else {
            format!("wp/v2/{endpoint}")
        };
        Ok(self.api.join(&relative)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request to an endpoint and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<WpResponse<T>, Error> {
        let mut url = self.endpoint_url(endpoint)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        debug!("GET {}", url);

        let mut request = self.http.get(url);
        if let Some(ref token) = self.auth {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request.send().await.map_err(Error::Transport)?;
        parse_response(resp).await
    }

    /// Ask a front-end URL whether it redirects, without following.
    ///
    /// Sends a `HEAD` request; a 3xx answer with a `Location` header yields
    /// the hop, anything else (including 404) yields `None`.
    pub async fn probe_redirect(&self, url: Url) -> Result<Option<RedirectHop>, Error> {
        debug!("HEAD {}", url);

        let resp = self
            .http
            .head(url.clone())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_redirection() {
            return Ok(None);
        }

        let Some(location) = header_str(resp.headers(), LOCATION.as_str()) else {
            return Ok(None);
        };

        let location = url.join(&location)?;
        debug!(status = status.as_u16(), %location, "redirection found");
        Ok(Some(RedirectHop {
            status: status.as_u16(),
            location,
        }))
    }
}

// ── Response parsing ─────────────────────────────────────────────────

async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<WpResponse<T>, Error> {
    let status = resp.status();

    if status.is_redirection() {
        let location = header_str(resp.headers(), LOCATION.as_str()).unwrap_or_default();
        return Err(Error::Redirect {
            status: status.as_u16(),
            location,
        });
    }

    if !status.is_success() {
        let status_text = status_text(status);
        let body = resp.text().await.unwrap_or_default();
        let (code, message) = serde_json::from_str::<WpErrorBody>(&body)
            .map(|b| (b.code, b.message))
            .unwrap_or((None, None));
        return Err(Error::Http {
            status: status.as_u16(),
            status_text,
            code,
            message,
        });
    }

    let total = count_header(resp.headers(), TOTAL_HEADER)?;
    let total_pages = count_header(resp.headers(), TOTAL_PAGES_HEADER)?;

    let body = resp.text().await.map_err(Error::Transport)?;
    let data = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.clone(),
    })?;

    Ok(WpResponse {
        data,
        total,
        total_pages,
    })
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown Status").to_owned()
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn count_header(headers: &HeaderMap, name: &'static str) -> Result<Option<u64>, Error> {
    match header_str(headers, name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidHeader { name, value }),
    }
}

fn with_final_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
