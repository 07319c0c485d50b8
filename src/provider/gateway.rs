use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::BoxFuture;
use crate::config::{ConfigError, SmsConfig};
use crate::domain::{BulkOutcome, Outcome};
use crate::provider::http::{HttpAuth, HttpRequest, HttpTransport, ReqwestTransport};
use crate::provider::{Provider, TransportError};
use crate::transport;

const SEND_PATH: &str = "send";
const SEND_BULK_PATH: &str = "send-bulk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How the HTTP gateway adapter performs [`Provider::send_bulk`].
pub enum BulkMode {
    /// One `POST /send-bulk` for the whole batch; all recipients share its outcome.
    #[default]
    Batch,
    /// One `POST /send` per recipient; each recipient gets its own outcome.
    PerRecipient,
}

#[derive(Debug, Clone)]
/// Builder for [`HttpGatewayProvider`].
pub struct HttpGatewayProviderBuilder {
    base_url: String,
    api_key: String,
    sender: String,
    bulk_mode: BulkMode,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpGatewayProviderBuilder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender: String::new(),
            bulk_mode: BulkMode::default(),
            timeout: None,
            user_agent: None,
        }
    }

    /// Sender name included in every request body.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn bulk_mode(mut self, bulk_mode: BulkMode) -> Self {
        self.bulk_mode = bulk_mode;
        self
    }

    /// Set an HTTP client timeout applied to the entire request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<HttpGatewayProvider, ConfigError> {
        let http = ReqwestTransport::shared(self.timeout, self.user_agent.as_deref())
            .map_err(ConfigError::HttpClient)?;
        self.build_with(http)
    }

    fn build_with(self, http: Arc<dyn HttpTransport>) -> Result<HttpGatewayProvider, ConfigError> {
        let base_url = url::Url::parse(self.base_url.trim()).map_err(|err| ConfigError::Invalid {
            field: "http.base_url",
            reason: format!("{err}: {}", self.base_url),
        })?;
        Ok(HttpGatewayProvider {
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
            api_key: self.api_key,
            sender: self.sender,
            bulk_mode: self.bulk_mode,
            http,
        })
    }
}

#[derive(Clone)]
/// Generic JSON gateway.
///
/// Sends `POST {base}/send` and `POST {base}/send-bulk` with a bearer token. Any 2xx reply is a
/// successful send; the external id is read from `message_id` (single) or `batch_id` (bulk).
/// Every request carries the sender set on the builder, whatever sender a dispatch records.
pub struct HttpGatewayProvider {
    base_url: String,
    api_key: String,
    sender: String,
    bulk_mode: BulkMode,
    http: Arc<dyn HttpTransport>,
}

impl HttpGatewayProvider {
    /// Registry key and persisted provider name.
    pub const NAME: &'static str = "http";

    pub fn builder(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> HttpGatewayProviderBuilder {
        HttpGatewayProviderBuilder::new(base_url, api_key)
    }

    pub fn from_config(config: &SmsConfig) -> Result<Self, ConfigError> {
        Self::builder(&config.http.base_url, &config.http.api_key)
            .sender(&config.default_sender)
            .bulk_mode(config.http.bulk_mode)
            .timeout(config.timeout())
            .build()
    }

    fn request(&self, path: &str, body: serde_json::Value) -> HttpRequest {
        HttpRequest {
            url: format!("{}/{path}", self.base_url),
            auth: Some(HttpAuth::Bearer(self.api_key.clone())),
            headers: Vec::new(),
            body,
        }
    }

    async fn send_one(&self, recipient: &str, message: &str) -> Result<Outcome, TransportError> {
        let body = transport::encode_send(recipient, message, &self.sender);
        let response = self.http.post_json(self.request(SEND_PATH, body)).await?;
        Ok(transport::decode_gateway_reply(
            response.status,
            &response.body,
        ))
    }

    async fn send_batch(
        &self,
        recipients: &[String],
        message: &str,
    ) -> Result<BulkOutcome, TransportError> {
        let body = transport::encode_send_bulk(recipients, message, &self.sender);
        let response = self
            .http
            .post_json(self.request(SEND_BULK_PATH, body))
            .await?;
        Ok(BulkOutcome::Batch(transport::decode_gateway_bulk_reply(
            response.status,
            &response.body,
        )))
    }

    /// Loop `/send`. A transport failure for one recipient becomes that recipient's failed
    /// outcome; the error is only returned when no recipient reached the gateway at all.
    async fn send_each(
        &self,
        recipients: &[String],
        message: &str,
    ) -> Result<BulkOutcome, TransportError> {
        let mut outcomes = Vec::with_capacity(recipients.len());
        let mut first_error = None;
        let mut reached = 0usize;

        for recipient in recipients {
            match self.send_one(recipient, message).await {
                Ok(outcome) => {
                    reached += 1;
                    outcomes.push(outcome);
                }
                Err(err) => {
                    warn!(provider = Self::NAME, recipient = %recipient, error = %err, "per-recipient send failed");
                    outcomes.push(Outcome::failed(
                        err.to_string(),
                        err.descriptor().into_value(),
                    ));
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) if reached == 0 => Err(err),
            _ => Ok(BulkOutcome::PerRecipient(outcomes)),
        }
    }
}

impl Provider for HttpGatewayProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn send<'a>(
        &'a self,
        recipient: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<Outcome, TransportError>> {
        Box::pin(self.send_one(recipient, message))
    }

    fn send_bulk<'a>(
        &'a self,
        recipients: &'a [String],
        message: &'a str,
    ) -> BoxFuture<'a, Result<BulkOutcome, TransportError>> {
        Box::pin(async move {
            match self.bulk_mode {
                BulkMode::Batch => self.send_batch(recipients, message).await,
                BulkMode::PerRecipient => self.send_each(recipients, message).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::OutcomeStatus;
    use crate::provider::http::fake::FakeTransport;

    fn make_provider(transport: &FakeTransport, bulk_mode: BulkMode) -> HttpGatewayProvider {
        HttpGatewayProvider::builder("https://api.example.com/", "test-api-key")
            .sender("TestApp")
            .bulk_mode(bulk_mode)
            .build_with(transport.shared())
            .unwrap()
    }

    fn recipients(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[tokio::test]
    async fn send_posts_json_with_bearer_auth() {
        let transport = FakeTransport::new().reply(
            200,
            r#"{"success": true, "message_id": "msg_123456", "status": "sent"}"#,
        );
        let provider = make_provider(&transport, BulkMode::Batch);

        let outcome = provider.send("+1234567890", "Test message").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Sent);
        assert_eq!(outcome.external_id.as_deref(), Some("msg_123456"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.example.com/send");
        assert!(matches!(
            &requests[0].auth,
            Some(HttpAuth::Bearer(token)) if token == "test-api-key"
        ));
        assert_eq!(
            requests[0].body,
            json!({"recipient": "+1234567890", "message": "Test message", "sender": "TestApp"})
        );
    }

    #[tokio::test]
    async fn wire_sender_is_the_configured_one() {
        use crate::dispatch::DispatchService;
        use crate::store::MemoryStore;

        let transport = FakeTransport::new().reply(200, r#"{"message_id": "m-1"}"#);
        let provider = make_provider(&transport, BulkMode::Batch);
        let service = DispatchService::new(Arc::new(provider), Arc::new(MemoryStore::new()));

        let record = service
            .builder()
            .to("+9779801002468")
            .message("hi")
            .from("Acme")
            .send()
            .await
            .unwrap();
        assert_eq!(record.sender.as_deref(), Some("Acme"));
        assert_eq!(transport.requests()[0].body["sender"], "TestApp");
    }

    #[tokio::test]
    async fn send_reports_gateway_rejection_as_outcome() {
        let transport = FakeTransport::new().reply(
            400,
            r#"{"success": false, "error": "Invalid recipient"}"#,
        );
        let provider = make_provider(&transport, BulkMode::Batch);

        let outcome = provider.send("+1234567890", "Test message").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("Invalid recipient"));
    }

    #[tokio::test]
    async fn send_propagates_transport_failure() {
        let transport =
            FakeTransport::new().fail(TransportError::Timeout("Connection timeout".into()));
        let provider = make_provider(&transport, BulkMode::Batch);

        let err = provider.send("+1234567890", "Test message").await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn batch_mode_makes_one_call() {
        let transport = FakeTransport::new().reply(200, r#"{"batch_id": "batch-9"}"#);
        let provider = make_provider(&transport, BulkMode::Batch);
        let to = recipients(&["+9779801002468", "+9779812345678"]);

        let bulk = provider.send_bulk(&to, "hi").await.unwrap();
        match bulk {
            BulkOutcome::Batch(outcome) => {
                assert!(outcome.is_sent());
                assert_eq!(outcome.external_id.as_deref(), Some("batch-9"));
            }
            BulkOutcome::PerRecipient(_) => panic!("expected one shared outcome"),
        }

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.example.com/send-bulk");
        assert_eq!(
            requests[0].body["recipients"],
            json!(["+9779801002468", "+9779812345678"])
        );
    }

    #[tokio::test]
    async fn per_recipient_mode_isolates_failures() {
        let transport = FakeTransport::new()
            .reply(200, r#"{"message_id": "msg_001"}"#)
            .reply(200, r#"{"message_id": "msg_002"}"#)
            .reply(400, r#"{"success": false, "error": "Invalid number"}"#);
        let provider = make_provider(&transport, BulkMode::PerRecipient);
        let to = recipients(&["+1234567890", "+0987654321", "+1111111111"]);

        let bulk = provider.send_bulk(&to, "Bulk test message").await.unwrap();
        let BulkOutcome::PerRecipient(outcomes) = bulk else {
            panic!("expected per-recipient outcomes");
        };
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].external_id.as_deref(), Some("msg_001"));
        assert_eq!(outcomes[1].external_id.as_deref(), Some("msg_002"));
        assert_eq!(outcomes[2].status, OutcomeStatus::Failed);
        assert_eq!(outcomes[2].error.as_deref(), Some("Invalid number"));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn per_recipient_mode_keeps_partial_progress_on_transport_failure() {
        let transport = FakeTransport::new()
            .reply(200, r#"{"message_id": "msg_001"}"#)
            .fail(TransportError::Connect("connection reset".into()));
        let provider = make_provider(&transport, BulkMode::PerRecipient);
        let to = recipients(&["+1234567890", "+0987654321"]);

        let BulkOutcome::PerRecipient(outcomes) = provider.send_bulk(&to, "hi").await.unwrap()
        else {
            panic!("expected per-recipient outcomes");
        };
        assert!(outcomes[0].is_sent());
        assert!(!outcomes[1].is_sent());
        assert_eq!(outcomes[1].raw_response["code"], 7);
    }

    #[tokio::test]
    async fn per_recipient_mode_fails_when_gateway_unreachable() {
        let transport = FakeTransport::new()
            .fail(TransportError::Connect("refused".into()))
            .fail(TransportError::Connect("refused".into()));
        let provider = make_provider(&transport, BulkMode::PerRecipient);
        let to = recipients(&["+1234567890", "+0987654321"]);

        let err = provider.send_bulk(&to, "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn reqwest_transport_talks_to_real_http() {
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/send"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_partial_json(json!({"recipient": "+9779801002468", "sender": "TestApp"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message_id": "msg_42"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/send-bulk"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "Quota exceeded"})),
            )
            .mount(&server)
            .await;

        let provider = HttpGatewayProvider::builder(format!("{}/v1", server.uri()), "test-api-key")
            .sender("TestApp")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let outcome = provider.send("+9779801002468", "hello").await.unwrap();
        assert!(outcome.is_sent());
        assert_eq!(outcome.external_id.as_deref(), Some("msg_42"));

        let to = recipients(&["+9779801002468"]);
        let BulkOutcome::Batch(outcome) = provider.send_bulk(&to, "hello").await.unwrap() else {
            panic!("expected one shared outcome");
        };
        assert!(!outcome.is_sent());
        assert_eq!(outcome.error.as_deref(), Some("Quota exceeded"));
    }

    #[test]
    fn builder_rejects_invalid_base_url() {
        let err = HttpGatewayProvider::builder("not a url", "key")
            .build_with(FakeTransport::new().shared())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "http.base_url",
                ..
            }
        ));
    }

    #[test]
    fn base_url_path_is_preserved() {
        let provider = HttpGatewayProvider::builder("https://gateway.test/v1/", "key")
            .build_with(FakeTransport::new().shared())
            .unwrap();
        assert_eq!(
            provider.request(SEND_PATH, json!({})).url,
            "https://gateway.test/v1/send"
        );
    }
}
