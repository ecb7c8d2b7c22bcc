use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{NewPost, Post, PostPatch};
use crate::util::parse_http_url;

/// Upper bound for a single response body. Embedded cover images make posts large.
const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024;

const COLLECTION: &str = "blogs";

// ============================================================================
// Error Types
// ============================================================================

/// Failure of a gateway call.
///
/// `Clone` so a single failed fetch can be handed to every coalesced caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Could not reach the blog service: {0}")]
    Transport(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Blog {id} was not found")]
    NotFound { id: String },
    #[error("Blog service returned HTTP {status}")]
    Status { status: u16 },
    #[error("Unexpected response from blog service: {0}")]
    Decode(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl GatewayError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(timeout.as_secs())
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the `/blogs` collection of the data service.
#[derive(Debug, Clone)]
pub struct BlogClient {
    http: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl BlogClient {
    /// Build a client for `base_url` (e.g. `http://localhost:3001`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base =
            parse_http_url(base_url).map_err(|e| GatewayError::InvalidBaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("quire/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base,
            timeout,
        })
    }

    /// `GET /blogs`
    pub async fn list_posts(&self) -> Result<Vec<Post>, GatewayError> {
        let request = self.http.get(self.collection_url()?);
        let response = self.execute(request, None).await?;
        read_json(response).await
    }

    /// `GET /blogs/{id}`
    pub async fn get_post(&self, id: &str) -> Result<Post, GatewayError> {
        let request = self.http.get(self.item_url(id)?);
        let response = self.execute(request, Some(id)).await?;
        read_json(response).await
    }

    /// `POST /blogs`, returning the post with its service-assigned id.
    pub async fn create_post(&self, input: &NewPost) -> Result<Post, GatewayError> {
        let request = with_json(self.http.post(self.collection_url()?), input)?;
        let response = self.execute(request, None).await?;
        read_json(response).await
    }

    /// `PATCH /blogs/{id}` with only the fields present in `patch`.
    pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post, GatewayError> {
        let request = with_json(self.http.patch(self.item_url(id)?), patch)?;
        let response = self.execute(request, Some(id)).await?;
        read_json(response).await
    }

    /// `DELETE /blogs/{id}`. Any 2xx counts as success; the body is ignored.
    pub async fn delete_post(&self, id: &str) -> Result<(), GatewayError> {
        let request = self.http.delete(self.item_url(id)?);
        self.execute(request, Some(id)).await?;
        Ok(())
    }

    fn collection_url(&self) -> Result<Url, GatewayError> {
        self.url_with(&[COLLECTION])
    }

    fn item_url(&self, id: &str) -> Result<Url, GatewayError> {
        self.url_with(&[COLLECTION, id])
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and map non-success statuses. `id` turns a 404 into `NotFound`.
    async fn execute(
        &self,
        request: RequestBuilder,
        id: Option<&str>,
    ) -> Result<Response, GatewayError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| GatewayError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(GatewayError::NotFound { id: id.to_string() });
            }
        }
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), url = %response.url(), "Blog service returned error status");
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn with_json<T: Serialize>(request: RequestBuilder, body: &T) -> Result<RequestBuilder, GatewayError> {
    let bytes = serde_json::to_vec(body)
        .map_err(|e| GatewayError::Decode(format!("failed to encode request: {e}")))?;
    Ok(request.header(CONTENT_TYPE, "application/json").body(bytes))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let bytes = read_limited(response, MAX_RESPONSE_SIZE).await?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
}

async fn read_limited(response: Response, limit: usize) -> Result<Vec<u8>, GatewayError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| GatewayError::Transport(e.to_string()))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Category;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "description": "A description that is long enough",
            "content": "Body",
            "coverImage": "https://images.example.com/a.jpg",
            "category": ["TECH"],
            "date": "2024-01-01T00:00:00Z"
        })
    }

    fn client_for(server: &MockServer) -> BlogClient {
        BlogClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                post_json("1", "Alpha"),
                post_json("2", "Beta")
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let posts = client_for(&server).list_posts().await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_get_post_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs/42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).get_post("42").await.unwrap_err();
        assert_eq!(err, GatewayError::NotFound { id: "42".into() });
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).list_posts().await.unwrap_err();
        assert_eq!(err, GatewayError::Status { status: 500 });
        assert_eq!(err.to_string(), "Blog service returned HTTP 500");
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_posts().await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_create_post_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/blogs"))
            .and(body_partial_json(serde_json::json!({
                "title": "Alpha",
                "coverImage": "https://images.example.com/a.jpg",
                "category": ["TECH"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(post_json("9", "Alpha")))
            .expect(1)
            .mount(&server)
            .await;

        let input = NewPost {
            title: "Alpha".into(),
            description: "A description that is long enough".into(),
            content: "Body".into(),
            cover_image: "https://images.example.com/a.jpg".into(),
            category: vec![Category::Tech],
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let created = client_for(&server).create_post(&input).await.unwrap();
        assert_eq!(created.id, "9");
    }

    #[tokio::test]
    async fn test_update_post_sends_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/blogs/3"))
            .and(body_json(serde_json::json!({ "title": "Renamed" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(post_json("3", "Renamed")))
            .expect(1)
            .mount(&server)
            .await;

        let patch = PostPatch {
            title: Some("Renamed".into()),
            ..PostPatch::default()
        };
        let updated = client_for(&server).update_post("3", &patch).await.unwrap();
        assert_eq!(updated.title, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_post_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/blogs/3"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_post("3").await.unwrap();
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            BlogClient::new(&format!("{}/api/", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(client.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = BlogClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
        let err = client.list_posts().await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = BlogClient::new("ftp://example.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_item_url_encodes_id() {
        let client = BlogClient::new("http://localhost:3001", Duration::from_secs(1)).unwrap();
        let url = client.item_url("a b/c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/blogs/a%20b%2Fc");
    }
}
