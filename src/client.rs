//! Rate-limited Lever API client.
//!
//! Single choke point for all upstream HTTP traffic. Every call acquires one
//! permit from a fixed pool sized strictly below Lever's published 10
//! requests/second ceiling; the permit is released on every exit path,
//! success or failure. The pool is the only throttling mechanism — a 429
//! from upstream surfaces as an ordinary status error and is never retried
//! here.
//!
//! Resource wrappers are thin parameter-shaping layers over [`LeverClient::request`];
//! [`LeverClient::collect_pages`] assembles unbounded logical result sets
//! from bounded physical pages, strictly sequentially to preserve cursor
//! order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::ApiError;

/// How much of a non-JSON body to keep for diagnostics.
const BODY_PREFIX_LEN: usize = 200;

/// Saturating conversion for caller-supplied result caps.
///
/// Oversized caps saturate at `u32::MAX` instead of wrapping, then the
/// per-page clamp in [`OpportunityFilter::to_query`] takes over.
pub fn page_limit(limit: usize) -> u32 {
    u32::try_from(limit).unwrap_or(u32::MAX)
}

/// One page of a list endpoint's `{ data, hasNext, next }` envelope.
///
/// Field extraction is defensive: a missing or wrong-typed field degrades to
/// empty items / `false` / `None` rather than failing the page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub has_next: bool,
    pub next: Option<String>,
}

impl Page {
    pub fn from_value(body: &Value) -> Self {
        let items = body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();
        let has_next = body
            .get("hasNext")
            .and_then(|h| h.as_bool())
            .unwrap_or(false);
        let next = body
            .get("next")
            .and_then(|n| n.as_str())
            .map(|n| n.to_string());
        Self {
            items,
            has_next,
            next,
        }
    }
}

/// Server-side filters accepted by the opportunities list endpoint.
///
/// Lever has no free-text query parameter — name and skill narrowing happen
/// client-side in [`crate::search`]. Only the filters below are sent.
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub stage_id: Option<String>,
    pub posting_id: Option<String>,
    pub email: Option<String>,
    pub tag: Option<String>,
    pub origin: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<String>,
}

impl OpportunityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage_id: Option<String>) -> Self {
        self.stage_id = stage_id;
        self
    }

    pub fn posting(mut self, posting_id: Option<String>) -> Self {
        self.posting_id = posting_id;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: Option<String>) -> Self {
        self.offset = offset;
        self
    }

    fn to_query(&self, page_size_max: u32) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(ref stage) = self.stage_id {
            query.push(("stage_id", stage.clone()));
        }
        if let Some(ref posting) = self.posting_id {
            query.push(("posting_id", posting.clone()));
        }
        if let Some(ref email) = self.email {
            query.push(("email", email.clone()));
        }
        if let Some(ref tag) = self.tag {
            query.push(("tag", tag.clone()));
        }
        if let Some(ref origin) = self.origin {
            query.push(("origin", origin.clone()));
        }
        if let Some(limit) = self.limit {
            // Oversized page sizes are clamped, never rejected.
            query.push(("limit", limit.min(page_size_max).to_string()));
        }
        if let Some(ref offset) = self.offset {
            query.push(("offset", offset.clone()));
        }
        query
    }
}

/// Authenticated, permit-gated HTTP client for the Lever API.
///
/// Built once at startup and shared across tool invocations so the permit
/// pool bounds the whole process. Cheap to clone.
#[derive(Clone)]
pub struct LeverClient {
    http: reqwest::Client,
    base_url: String,
    permits: Arc<Semaphore>,
    page_size_max: u32,
}

impl LeverClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| anyhow::anyhow!("API key contains invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.lever.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.lever.base_url.trim_end_matches('/').to_string(),
            permits: Arc::new(Semaphore::new(config.lever.concurrent_requests)),
            page_size_max: config.lever.page_size_max,
        })
    }

    /// In-flight permits currently available. Exposed for tests.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Issue one rate-limited request and decode the JSON response.
    ///
    /// The permit guard is held for the full request/response cycle and
    /// dropped on every return path below.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let _permit = self.permits.acquire().await.expect("permit pool closed");

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %path, "lever api request");

        let mut builder = self.http.request(method, &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from_transport)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let text = response.text().await.map_err(ApiError::from_transport)?;

        if !content_type.contains("application/json") {
            let body_prefix: String = text.chars().take(BODY_PREFIX_LEN).collect();
            return Err(ApiError::UnexpectedContentType {
                content_type,
                body_prefix,
            });
        }

        let decoded: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;

        if status >= 400 {
            return Err(ApiError::from_status(status, &decoded));
        }

        Ok(decoded)
    }

    // ── Opportunities ────────────────────────────────────────────────────

    /// List candidates, optionally filtered server-side.
    pub async fn opportunities(&self, filter: &OpportunityFilter) -> Result<Page, ApiError> {
        let query = filter.to_query(self.page_size_max);
        let body = self
            .request(Method::GET, "/opportunities", &query, None)
            .await?;
        Ok(Page::from_value(&body))
    }

    /// Fetch a single candidate record.
    pub async fn opportunity(&self, opportunity_id: &str) -> Result<Value, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("/opportunities/{}", opportunity_id),
                &[],
                None,
            )
            .await?;
        Ok(unwrap_data(body))
    }

    /// Move a candidate to a new pipeline stage.
    pub async fn update_stage(
        &self,
        opportunity_id: &str,
        stage_id: &str,
        reason: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut body = json!({ "stage": stage_id });
        if let Some(reason) = reason {
            body["reason"] = json!(reason);
        }
        self.request(
            Method::POST,
            &format!("/opportunities/{}/stage", opportunity_id),
            &[],
            Some(&body),
        )
        .await
    }

    /// Add a note to a candidate's profile.
    pub async fn add_note(
        &self,
        opportunity_id: &str,
        note: &str,
        author_email: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut body = json!({ "value": note });
        if let Some(author) = author_email {
            body["author"] = json!(author);
        }
        self.request(
            Method::POST,
            &format!("/opportunities/{}/notes", opportunity_id),
            &[],
            Some(&body),
        )
        .await
    }

    /// Archive a candidate with a reason.
    pub async fn archive(&self, opportunity_id: &str, reason_id: &str) -> Result<Value, ApiError> {
        let body = json!({ "reason": reason_id });
        self.request(
            Method::POST,
            &format!("/opportunities/{}/archived", opportunity_id),
            &[],
            Some(&body),
        )
        .await
    }

    // ── Postings, stages, archive reasons ────────────────────────────────

    /// List job postings in the given state.
    pub async fn postings(
        &self,
        state: &str,
        limit: u32,
        offset: Option<String>,
    ) -> Result<Page, ApiError> {
        let mut query = vec![
            ("state", state.to_string()),
            ("limit", limit.min(self.page_size_max).to_string()),
        ];
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }
        let body = self.request(Method::GET, "/postings", &query, None).await?;
        Ok(Page::from_value(&body))
    }

    /// List pipeline stages.
    pub async fn stages(&self) -> Result<Page, ApiError> {
        let body = self.request(Method::GET, "/stages", &[], None).await?;
        Ok(Page::from_value(&body))
    }

    /// List archive reasons.
    pub async fn archive_reasons(&self) -> Result<Page, ApiError> {
        let body = self
            .request(Method::GET, "/archive_reasons", &[], None)
            .await?;
        Ok(Page::from_value(&body))
    }

    // ── Files and applications ───────────────────────────────────────────

    /// List files attached to a candidate.
    pub async fn files(&self, opportunity_id: &str) -> Result<Page, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("/opportunities/{}/files", opportunity_id),
                &[],
                None,
            )
            .await?;
        Ok(Page::from_value(&body))
    }

    /// List resumes attached to a candidate.
    pub async fn resumes(&self, opportunity_id: &str) -> Result<Page, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("/opportunities/{}/resumes", opportunity_id),
                &[],
                None,
            )
            .await?;
        Ok(Page::from_value(&body))
    }

    /// Download a file by its absolute URL, reusing the authenticated session.
    pub async fn download_file(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let _permit = self.permits.acquire().await.expect("permit pool closed");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ApiError::Status {
                status,
                message: format!("Failed to download file: {}", status),
            });
        }
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        Ok(bytes.to_vec())
    }

    /// List a candidate's applications.
    pub async fn applications(&self, opportunity_id: &str) -> Result<Page, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("/opportunities/{}/applications", opportunity_id),
                &[],
                None,
            )
            .await?;
        Ok(Page::from_value(&body))
    }

    /// Fetch a single application.
    pub async fn application(
        &self,
        opportunity_id: &str,
        application_id: &str,
    ) -> Result<Value, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!(
                    "/opportunities/{}/applications/{}",
                    opportunity_id, application_id
                ),
                &[],
                None,
            )
            .await?;
        Ok(unwrap_data(body))
    }

    /// Apply a candidate to a posting.
    pub async fn create_application(
        &self,
        opportunity_id: &str,
        posting_id: &str,
        user_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut body = json!({ "postingId": posting_id });
        if let Some(user) = user_id {
            body["userId"] = json!(user);
        }
        let response = self
            .request(
                Method::POST,
                &format!("/opportunities/{}/applications", opportunity_id),
                &[],
                Some(&body),
            )
            .await?;
        Ok(unwrap_data(response))
    }

    // ── Pagination ───────────────────────────────────────────────────────

    /// Collect every item across all pages of a list endpoint.
    ///
    /// `fetch` is invoked with the current cursor (`None` first). Cursor
    /// advancement prefers the envelope's `next` field, falling back to the
    /// id of the page's last item. Termination: `hasNext` false, an empty
    /// page, or no usable cursor — an empty page with `hasNext` still true
    /// is treated as terminal rather than looping on upstream inconsistency.
    pub async fn collect_pages<F, Fut>(&self, mut fetch: F) -> Result<Vec<Value>, ApiError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page, ApiError>>,
    {
        let mut all = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let page = fetch(offset.clone()).await?;
            if page.items.is_empty() {
                break;
            }
            let last_id = page
                .items
                .last()
                .and_then(|item| item.get("id"))
                .and_then(|id| id.as_str())
                .map(|id| id.to_string());
            let has_next = page.has_next;
            let next = page.next.clone();
            all.extend(page.items);

            if !has_next {
                break;
            }
            offset = next.or(last_id);
            if offset.is_none() {
                break;
            }
        }

        Ok(all)
    }
}

/// List envelopes wrap single records in `data` too; fall through to the
/// whole body when the wrapper is absent.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Object(map)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_well_formed_envelope() {
        let body = json!({
            "data": [{ "id": "a" }, { "id": "b" }],
            "hasNext": true,
            "next": "cursor-1"
        });
        let page = Page::from_value(&body);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next);
        assert_eq!(page.next.as_deref(), Some("cursor-1"));
    }

    #[test]
    fn test_page_from_degenerate_envelopes() {
        let page = Page::from_value(&json!({}));
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(page.next.is_none());

        let page = Page::from_value(&json!({ "data": "nope", "hasNext": "yes", "next": 3 }));
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_filter_clamps_oversized_limit() {
        let filter = OpportunityFilter::new().limit(500);
        let query = filter.to_query(100);
        assert!(query.contains(&("limit", "100".to_string())));
    }

    #[test]
    fn test_filter_omits_unset_params() {
        let filter = OpportunityFilter::new().email("a@b.co");
        let query = filter.to_query(100);
        assert_eq!(query, vec![("email", "a@b.co".to_string())]);
    }

    #[test]
    fn test_page_limit_saturates() {
        assert_eq!(page_limit(5), 5);
        assert_eq!(page_limit(u32::MAX as usize), u32::MAX);
        assert_eq!(page_limit(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_unwrap_data() {
        assert_eq!(
            unwrap_data(json!({ "data": { "id": "x" } })),
            json!({ "id": "x" })
        );
        assert_eq!(unwrap_data(json!({ "id": "y" })), json!({ "id": "y" }));
    }
}
