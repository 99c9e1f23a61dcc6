//! Mock ingestion endpoint for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transfer::{Connector, FilePart, HttpTransport, TransportError, TransportResponse};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedMethod {
    Get,
    Post,
}

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: RecordedMethod,
    /// Resource relative to the base URL.
    pub resource: String,
    /// Multipart field name (POST only).
    pub field_name: Option<String>,
    /// Multipart file name (POST only).
    pub file_name: Option<String>,
    /// Uploaded bytes (empty for GET).
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
enum PostBehavior {
    Status(u16),
    Body(String),
    Error,
    Hang,
}

#[derive(Debug, Clone)]
struct PostRule {
    prefix: String,
    behavior: PostBehavior,
}

/// Mock implementation of the HttpTransport trait.
///
/// Every request is recorded, including ones that fail or hang. POST
/// behavior is chosen by resource prefix; the most recently added matching
/// rule wins, and unmatched POSTs get an empty 200.
///
/// # Example
///
/// ```rust,ignore
/// let connector = MockConnector::new();
/// connector.transport().set_post_status_for("file/1/", 500).await;
///
/// // run a transfer...
///
/// let requests = connector.transport().recorded_requests().await;
/// assert_eq!(requests[0].resource, "heartbeat");
/// ```
#[derive(Debug)]
pub struct MockTransport {
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    ping_status: Arc<RwLock<u16>>,
    ping_error: Arc<RwLock<bool>>,
    post_rules: Arc<RwLock<Vec<PostRule>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock endpoint that accepts everything.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            ping_status: Arc::new(RwLock::new(200)),
            ping_error: Arc::new(RwLock::new(false)),
            post_rules: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get all recorded requests in order.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Recorded POSTs only.
    pub async fn recorded_posts(&self) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.method == RecordedMethod::Post)
            .cloned()
            .collect()
    }

    pub async fn post_count(&self) -> usize {
        self.recorded_posts().await.len()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }

    /// Status returned for GET requests.
    pub async fn set_ping_status(&self, status: u16) {
        *self.ping_status.write().await = status;
    }

    /// Make GET requests fail without a status.
    pub async fn set_ping_error(&self, fail: bool) {
        *self.ping_error.write().await = fail;
    }

    /// Answer POSTs to resources starting with `prefix` with `status`.
    pub async fn set_post_status_for(&self, prefix: &str, status: u16) {
        self.add_rule(prefix, PostBehavior::Status(status)).await;
    }

    /// Answer POSTs to resources starting with `prefix` with 200 and `body`.
    pub async fn set_post_body_for(&self, prefix: &str, body: &str) {
        self.add_rule(prefix, PostBehavior::Body(body.to_string()))
            .await;
    }

    /// Fail POSTs to resources starting with `prefix` without a status.
    pub async fn set_post_error_for(&self, prefix: &str) {
        self.add_rule(prefix, PostBehavior::Error).await;
    }

    /// Never answer POSTs to resources starting with `prefix`.
    pub async fn hang_posts_matching(&self, prefix: &str) {
        self.add_rule(prefix, PostBehavior::Hang).await;
    }

    async fn add_rule(&self, prefix: &str, behavior: PostBehavior) {
        self.post_rules.write().await.push(PostRule {
            prefix: prefix.to_string(),
            behavior,
        });
    }

    async fn record(&self, request: RecordedRequest) {
        self.requests.write().await.push(request);
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, resource: &str) -> Result<TransportResponse, TransportError> {
        self.record(RecordedRequest {
            method: RecordedMethod::Get,
            resource: resource.to_string(),
            field_name: None,
            file_name: None,
            body: Vec::new(),
        })
        .await;

        if *self.ping_error.read().await {
            return Err(TransportError::ConnectionFailed(
                "mock heartbeat failure".to_string(),
            ));
        }
        Ok(TransportResponse::new(*self.ping_status.read().await, ""))
    }

    async fn post_file(
        &self,
        resource: &str,
        part: FilePart,
    ) -> Result<TransportResponse, TransportError> {
        self.record(RecordedRequest {
            method: RecordedMethod::Post,
            resource: resource.to_string(),
            field_name: Some(part.field_name),
            file_name: Some(part.file_name),
            body: part.bytes,
        })
        .await;

        let behavior = self
            .post_rules
            .read()
            .await
            .iter()
            .rev()
            .find(|rule| resource.starts_with(&rule.prefix))
            .map(|rule| rule.behavior.clone());

        match behavior {
            None => Ok(TransportResponse::new(200, "")),
            Some(PostBehavior::Status(status)) => Ok(TransportResponse::new(status, "")),
            Some(PostBehavior::Body(body)) => Ok(TransportResponse::new(200, body)),
            Some(PostBehavior::Error) => Err(TransportError::RequestFailed(
                "mock upload failure".to_string(),
            )),
            Some(PostBehavior::Hang) => std::future::pending().await,
        }
    }
}

/// Mock implementation of the Connector trait.
///
/// Clones share the same [`MockTransport`] and counters, so a test can keep
/// one handle while the code under test owns another.
#[derive(Debug, Clone)]
pub struct MockConnector {
    transport: Arc<MockTransport>,
    connects: Arc<AtomicUsize>,
    fail_connect: Arc<AtomicBool>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(MockTransport::new()),
            connects: Arc::new(AtomicUsize::new(0)),
            fail_connect: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The endpoint every channel talks to.
    pub fn transport(&self) -> &MockTransport {
        &self.transport
    }

    /// Number of channels opened so far, including failed attempts.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make `connect` fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&self) -> Result<Arc<dyn HttpTransport>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(
                "mock connect failure".to_string(),
            ));
        }
        let transport: Arc<dyn HttpTransport> = self.transport.clone();
        Ok(transport)
    }
}
