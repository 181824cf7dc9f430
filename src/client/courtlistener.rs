//! CourtListener REST client.
//!
//! Each operation takes one rate-limiter token before the execution policy
//! runs. HTTP outcomes become [`CallFailure`] variants at the call site:
//! 429 is a rate-limit answer (never retried, never counted), 404 is
//! not-found, 5xx is a transient server error handled by the policy.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::*;
use super::CaseLawApi;
use crate::error::{CallFailure, PolicyError};
use crate::resilience::{ExecutionPolicy, TokenBucketRateLimiter};

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v4";

/// Retry hint when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_MS: u64 = 60_000;

/// CourtListener-backed [`CaseLawApi`].
pub struct CourtListenerClient {
    http: Client,
    base_url: String,
    api_key: String,
    policy: Arc<ExecutionPolicy>,
    rate_limiter: Arc<TokenBucketRateLimiter>,
}

/// Cluster resource, reduced to the sub-opinion links.
#[derive(Debug, Deserialize)]
struct ClusterResponse {
    #[serde(default)]
    sub_opinions: Vec<String>,
}

/// Sub-opinion resource.
#[derive(Debug, Deserialize)]
struct SubOpinionResponse {
    id: u64,
    #[serde(rename = "type", default)]
    opinion_type: String,
    #[serde(default)]
    plain_text: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

impl CourtListenerClient {
    /// Create a client sharing the given policy and rate limiter.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        policy: Arc<ExecutionPolicy>,
        rate_limiter: Arc<TokenBucketRateLimiter>,
    ) -> reqwest::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("lexcerta/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            policy,
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    pub fn rate_limiter(&self) -> &TokenBucketRateLimiter {
        &self.rate_limiter
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }

    /// Take a token, or report how long until one accrues.
    fn admit(&self, operation: &str) -> Result<(), u64> {
        if self.rate_limiter.try_consume(1) {
            return Ok(());
        }
        let retry_after_ms = self.rate_limiter.ms_until_next_token();
        warn!(operation, retry_after_ms, "Rate limit exhausted, blocking request");
        Err(retry_after_ms)
    }

    async fn post_lookup(&self, citation: &str) -> Result<Vec<CitationMatch>, CallFailure> {
        let response = self
            .http
            .post(format!("{}/citation-lookup/", self.base_url))
            .header(header::AUTHORIZATION, self.auth_header())
            .form(&[("text", citation)])
            .send()
            .await
            .map_err(transport_failure)?;

        let response = check_status(response)?;
        response
            .json::<Vec<CitationMatch>>()
            .await
            .map_err(|e| CallFailure::Decode(e.to_string()))
    }

    /// One attempt at a cluster and its sub-opinions. `None` means 404.
    async fn get_cluster(&self, cluster_id: u64) -> Result<Option<Vec<OpinionText>>, CallFailure> {
        let response = self
            .http
            .get(format!("{}/clusters/{}/", self.base_url, cluster_id))
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(transport_failure)?;

        let response = match check_status(response) {
            Ok(response) => response,
            Err(CallFailure::NotFound) => return Ok(None),
            Err(failure) => return Err(failure),
        };

        let cluster: ClusterResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::Decode(e.to_string()))?;

        let fetches = cluster
            .sub_opinions
            .iter()
            .map(|url| self.get_sub_opinion(url, cluster_id));
        let opinions: Vec<OpinionText> = futures::future::join_all(fetches)
            .await
            .into_iter()
            .flatten()
            .collect();

        debug!(
            cluster_id,
            linked = cluster.sub_opinions.len(),
            retrieved = opinions.len(),
            "Fetched cluster opinions"
        );
        Ok(Some(opinions))
    }

    /// Fetch one sub-opinion's text. Failures and empty texts are skipped.
    async fn get_sub_opinion(&self, url: &str, cluster_id: u64) -> Option<OpinionText> {
        let response = match self
            .http
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Failed to fetch sub-opinion");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(url, status = response.status().as_u16(), "Failed to fetch sub-opinion");
            return None;
        }

        let opinion: SubOpinionResponse = match response.json().await {
            Ok(opinion) => opinion,
            Err(e) => {
                warn!(url, error = %e, "Malformed sub-opinion");
                return None;
            }
        };

        let text = extract_text(opinion.plain_text.as_deref(), opinion.html.as_deref());
        if text.is_empty() {
            debug!(opinion_id = opinion.id, "Sub-opinion has no extractable text");
            return None;
        }

        Some(OpinionText {
            opinion_id: opinion.id,
            opinion_type: opinion.opinion_type,
            plain_text: text,
            cluster_id,
        })
    }
}

#[async_trait]
impl CaseLawApi for CourtListenerClient {
    async fn lookup_citation(&self, normalized: &str) -> LookupResponse {
        if let Err(retry_after_ms) = self.admit("lookup_citation") {
            return LookupResponse::RateLimited { retry_after_ms };
        }

        match self.policy.execute(|| self.post_lookup(normalized)).await {
            Ok(matches) => LookupResponse::Ok { matches },
            Err(PolicyError::Failed(CallFailure::RateLimited { retry_after_ms })) => {
                warn!(retry_after_ms, "Upstream rate limit on citation lookup");
                LookupResponse::RateLimited { retry_after_ms }
            }
            Err(e) => {
                warn!(citation = %normalized, error = %e, "Citation lookup failed");
                LookupResponse::Error {
                    code: "API_ERROR".to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    async fn fetch_cluster_opinions(&self, cluster_id: u64) -> OpinionTextResponse {
        if let Err(retry_after_ms) = self.admit("fetch_cluster_opinions") {
            return OpinionTextResponse::RateLimited { retry_after_ms };
        }

        match self.policy.execute(|| self.get_cluster(cluster_id)).await {
            Ok(Some(opinions)) => OpinionTextResponse::Ok { opinions },
            Ok(None) => OpinionTextResponse::NotFound,
            Err(PolicyError::Failed(CallFailure::RateLimited { retry_after_ms })) => {
                warn!(retry_after_ms, "Upstream rate limit on opinion fetch");
                OpinionTextResponse::RateLimited { retry_after_ms }
            }
            Err(e) => {
                warn!(cluster_id, error = %e, "Opinion fetch failed");
                OpinionTextResponse::Error {
                    code: "API_ERROR".to_string(),
                    message: e.to_string(),
                }
            }
        }
    }
}

fn transport_failure(e: reqwest::Error) -> CallFailure {
    CallFailure::Transport(e.to_string())
}

/// Translate non-success statuses into call failures.
fn check_status(response: Response) -> Result<Response, CallFailure> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CallFailure::RateLimited {
            retry_after_ms: retry_after_ms(response.headers()),
        });
    }
    if status == StatusCode::NOT_FOUND {
        return Err(CallFailure::NotFound);
    }
    if status.is_server_error() {
        return Err(CallFailure::Server {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(CallFailure::UnexpectedStatus {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// `Retry-After` in seconds, converted to milliseconds.
fn retry_after_ms(headers: &header::HeaderMap) -> u64 {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
        .unwrap_or(DEFAULT_RETRY_AFTER_MS)
}

/// Prefer plain text; fall back to de-marked-up HTML.
fn extract_text(plain_text: Option<&str>, html: Option<&str>) -> String {
    let plain = plain_text.unwrap_or_default().trim();
    if !plain.is_empty() {
        return plain.to_string();
    }
    html.map(strip_html).unwrap_or_default()
}

/// Remove tags, collapse entities and whitespace.
pub fn strip_html(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
    let entity =
        ENTITY.get_or_init(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("valid entity pattern"));

    let without_tags = tag.replace_all(html, "");
    let without_entities = entity.replace_all(&without_tags, " ");
    without_entities.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{BreakerConfig, CircuitState, PolicyConfig, RateLimiterConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(threshold: u32) -> Arc<ExecutionPolicy> {
        Arc::new(ExecutionPolicy::new(
            "courtlistener-test",
            PolicyConfig {
                timeout: Duration::from_secs(2),
                max_retries: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                breaker: BreakerConfig {
                    failure_threshold: threshold,
                    cooldown: Duration::from_secs(30),
                },
            },
        ))
    }

    fn client_for(server: &MockServer, tokens: u32) -> CourtListenerClient {
        CourtListenerClient::new(
            "test-key",
            server.uri(),
            fast_policy(5),
            Arc::new(TokenBucketRateLimiter::new(RateLimiterConfig {
                max_tokens: tokens,
                refill_interval: Duration::from_secs(3600),
            })),
        )
        .unwrap()
    }

    fn brown_match() -> serde_json::Value {
        json!([{
            "citation": "347 U.S. 483",
            "normalized_citations": ["347 U.S. 483"],
            "start_index": 0,
            "end_index": 12,
            "status": 200,
            "error_message": "",
            "clusters": [{
                "absolute_url": "/opinion/105221/brown-v-board-of-education/",
                "case_name": "Brown v. Board of Education",
                "case_name_short": "Brown",
                "date_filed": "1954-05-17",
                "docket": { "court": "Supreme Court of the United States", "court_id": "scotus" },
                "citations": [{ "volume": 347, "reporter": "U.S.", "page": "483" }]
            }]
        }])
    }

    #[test]
    fn test_strip_html() {
        let html = "<p>Separate&nbsp;educational <em>facilities</em></p>\n<p>are &amp; unequal.</p>";
        assert_eq!(strip_html(html), "Separate educational facilities are unequal.");
    }

    #[test]
    fn test_extract_text_prefers_plain_text() {
        assert_eq!(extract_text(Some("plain"), Some("<p>html</p>")), "plain");
        assert_eq!(extract_text(Some("  "), Some("<p>html</p>")), "html");
        assert_eq!(extract_text(None, Some("<br/>")), "");
        assert_eq!(extract_text(None, None), "");
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = header::HeaderMap::new();
        assert_eq!(retry_after_ms(&headers), 60_000);
        headers.insert(header::RETRY_AFTER, header::HeaderValue::from_static("7"));
        assert_eq!(retry_after_ms(&headers), 7_000);
        headers.insert(
            header::RETRY_AFTER,
            header::HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_ms(&headers), 60_000);
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .and(header_eq("authorization", "Token test-key"))
            .and(body_string_contains("text=347+U.S.+483"))
            .respond_with(ResponseTemplate::new(200).set_body_json(brown_match()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        match client.lookup_citation("347 U.S. 483").await {
            LookupResponse::Ok { matches } => {
                assert_eq!(matches.len(), 1);
                assert!(matches[0].is_verified());
                assert_eq!(matches[0].clusters[0].case_name, "Brown v. Board of Education");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_429_uses_retry_after_and_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        assert_eq!(
            client.lookup_citation("347 U.S. 483").await,
            LookupResponse::RateLimited { retry_after_ms: 2000 }
        );
        assert_eq!(client.policy().circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_lookup_429_without_header_defaults_to_a_minute() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        assert_eq!(
            client.lookup_citation("347 U.S. 483").await,
            LookupResponse::RateLimited { retry_after_ms: 60_000 }
        );
    }

    #[tokio::test]
    async fn test_lookup_5xx_is_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        match client.lookup_citation("347 U.S. 483").await {
            LookupResponse::Error { code, message } => {
                assert_eq!(code, "API_ERROR");
                assert!(message.contains("503"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_5xx_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(brown_match()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        assert!(matches!(
            client.lookup_citation("347 U.S. 483").await,
            LookupResponse::Ok { .. }
        ));
    }

    #[tokio::test]
    async fn test_local_budget_blocks_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(brown_match()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 1);
        assert!(matches!(
            client.lookup_citation("347 U.S. 483").await,
            LookupResponse::Ok { .. }
        ));
        match client.lookup_citation("347 U.S. 483").await {
            LookupResponse::RateLimited { retry_after_ms } => assert!(retry_after_ms > 0),
            other => panic!("unexpected response: {:?}", other),
        }
        match client.fetch_cluster_opinions(105221).await {
            OpinionTextResponse::RateLimited { retry_after_ms } => assert!(retry_after_ms > 0),
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(client.policy().circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_fetch_cluster_opinions() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/clusters/105221/"))
            .and(header_eq("authorization", "Token test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 105221,
                "sub_opinions": [
                    format!("{}/opinions/1/", base),
                    format!("{}/opinions/2/", base),
                    format!("{}/opinions/3/", base),
                    format!("{}/opinions/4/", base),
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/opinions/1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "type": "020lead",
                "plain_text": "Separate educational facilities are inherently unequal.",
                "html": ""
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/opinions/2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 2, "type": "030concurrence",
                "plain_text": "",
                "html": "<p>I concur&nbsp;in the <b>judgment</b>.</p>"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/opinions/3/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "type": "040dissent", "plain_text": null, "html": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/opinions/4/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        let opinions = match client.fetch_cluster_opinions(105221).await {
            OpinionTextResponse::Ok { opinions } => opinions,
            other => panic!("unexpected response: {:?}", other),
        };

        assert_eq!(opinions.len(), 2);
        assert_eq!(opinions[0].opinion_id, 1);
        assert_eq!(opinions[0].opinion_type, "020lead");
        assert_eq!(opinions[0].cluster_id, 105221);
        assert_eq!(opinions[1].opinion_id, 2);
        assert_eq!(opinions[1].plain_text, "I concur in the judgment.");
        // One token for the whole cluster
        assert_eq!(client.rate_limiter().remaining(), 9);
    }

    #[tokio::test]
    async fn test_cluster_without_text_is_ok_and_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clusters/7/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sub_opinions": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        assert_eq!(
            client.fetch_cluster_opinions(7).await,
            OpinionTextResponse::Ok { opinions: vec![] }
        );
    }

    #[tokio::test]
    async fn test_cluster_404_is_not_found_and_not_a_breaker_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clusters/404404/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = CourtListenerClient::new(
            "test-key",
            server.uri(),
            fast_policy(1),
            Arc::new(TokenBucketRateLimiter::default()),
        )
        .unwrap();

        assert_eq!(
            client.fetch_cluster_opinions(404404).await,
            OpinionTextResponse::NotFound
        );
        assert_eq!(client.policy().circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_cluster_5xx_opens_breaker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clusters/1/"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let client = CourtListenerClient::new(
            "test-key",
            server.uri(),
            fast_policy(1),
            Arc::new(TokenBucketRateLimiter::default()),
        )
        .unwrap();

        match client.fetch_cluster_opinions(1).await {
            OpinionTextResponse::Error { code, message } => {
                assert_eq!(code, "API_ERROR");
                assert!(message.contains("Circuit breaker is open"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(client.policy().circuit_state(), CircuitState::Open);
    }
}
