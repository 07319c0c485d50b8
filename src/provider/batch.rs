use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::BoxFuture;
use crate::config::{ConfigError, SmsConfig};
use crate::domain::{BulkOutcome, Outcome};
use crate::provider::http::{HttpAuth, HttpRequest, HttpTransport, ReqwestTransport};
use crate::provider::{Provider, TransportError};
use crate::transport;

const ORGANISATION_HEADER: &str = "OrganisationCode";
const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone)]
/// Builder for [`BatchGatewayProvider`].
pub struct BatchGatewayProviderBuilder {
    single_url: String,
    bulk_url: String,
    organisation_code: String,
    username: String,
    password: String,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl BatchGatewayProviderBuilder {
    pub fn new(
        organisation_code: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            single_url: BatchGatewayProvider::DEFAULT_SINGLE_ENDPOINT.to_owned(),
            bulk_url: BatchGatewayProvider::DEFAULT_BULK_ENDPOINT.to_owned(),
            organisation_code: organisation_code.into(),
            username: username.into(),
            password: password.into(),
            timeout: None,
            user_agent: None,
        }
    }

    pub fn single_url(mut self, url: impl Into<String>) -> Self {
        self.single_url = url.into();
        self
    }

    pub fn bulk_url(mut self, url: impl Into<String>) -> Self {
        self.bulk_url = url.into();
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

    pub fn build(self) -> Result<BatchGatewayProvider, ConfigError> {
        let http = ReqwestTransport::shared(self.timeout, self.user_agent.as_deref())
            .map_err(ConfigError::HttpClient)?;
        self.build_with(http)
    }

    fn build_with(self, http: Arc<dyn HttpTransport>) -> Result<BatchGatewayProvider, ConfigError> {
        check_url("batch.single_url", &self.single_url)?;
        check_url("batch.bulk_url", &self.bulk_url)?;
        Ok(BatchGatewayProvider {
            single_url: self.single_url.trim().to_owned(),
            bulk_url: self.bulk_url.trim().to_owned(),
            organisation_code: self.organisation_code,
            username: self.username,
            password: self.password,
            http,
        })
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value.trim())
        .map(|_| ())
        .map_err(|err| ConfigError::Invalid {
            field,
            reason: format!("{err}: {value}"),
        })
}

#[derive(Clone)]
/// Gateway with a native batch API.
///
/// Authenticates with HTTP basic auth plus an `OrganisationCode` header. A reply is a
/// successful send only when the gateway reports `responseCode` 100. Bulk sends go out as one
/// request tagged with a locally generated `batch_` id, which becomes the external id of the
/// shared outcome.
pub struct BatchGatewayProvider {
    single_url: String,
    bulk_url: String,
    organisation_code: String,
    username: String,
    password: String,
    http: Arc<dyn HttpTransport>,
}

impl BatchGatewayProvider {
    /// Registry key and persisted provider name.
    pub const NAME: &'static str = "batch";

    pub const DEFAULT_SINGLE_ENDPOINT: &'static str =
        "https://smartsms.swifttech.com.np:8083/api/Sms/ExecuteSendSmsV5";
    pub const DEFAULT_BULK_ENDPOINT: &'static str =
        "https://smartsms.swifttech.com.np:8083/api/Sms/SaveBulkSMSV5";

    pub fn builder(
        organisation_code: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> BatchGatewayProviderBuilder {
        BatchGatewayProviderBuilder::new(organisation_code, username, password)
    }

    pub fn from_config(config: &SmsConfig) -> Result<Self, ConfigError> {
        let batch = &config.batch;
        Self::builder(&batch.organisation_code, &batch.username, &batch.password)
            .single_url(&batch.single_url)
            .bulk_url(&batch.bulk_url)
            .timeout(config.timeout())
            .build()
    }

    fn request(&self, url: &str, body: serde_json::Value) -> HttpRequest {
        HttpRequest {
            url: url.to_owned(),
            auth: Some(HttpAuth::Basic {
                username: self.username.clone(),
                password: self.password.clone(),
            }),
            headers: vec![(
                ORGANISATION_HEADER.to_owned(),
                self.organisation_code.clone(),
            )],
            body,
        }
    }

    async fn send_one(&self, recipient: &str, message: &str) -> Result<Outcome, TransportError> {
        let body = transport::encode_batch_single(recipient, message, &local_timestamp());
        let response = self
            .http
            .post_json(self.request(&self.single_url, body))
            .await?;
        Ok(transport::decode_batch_reply(response.status, &response.body))
    }

    async fn send_batch(
        &self,
        recipients: &[String],
        message: &str,
    ) -> Result<BulkOutcome, TransportError> {
        let batch_id = new_batch_id();
        let body =
            transport::encode_batch_bulk(recipients, message, &batch_id, &local_timestamp());
        let response = self
            .http
            .post_json(self.request(&self.bulk_url, body))
            .await?;
        let outcome = transport::decode_batch_reply(response.status, &response.body);
        Ok(BulkOutcome::Batch(outcome.with_external_id(batch_id)))
    }
}

fn new_batch_id() -> String {
    format!("batch_{}", Uuid::new_v4().simple())
}

fn local_timestamp() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

impl Provider for BatchGatewayProvider {
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
        Box::pin(self.send_batch(recipients, message))
    }
}
