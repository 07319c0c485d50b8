//! HTTP seam shared by the reference adapters.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::BoxFuture;
use crate::provider::TransportError;

#[derive(Debug, Clone)]
pub(crate) enum HttpAuth {
    Bearer(String),
    Basic { username: String, password: String },
}

#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub url: String,
    pub auth: Option<HttpAuth>,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub(crate) trait HttpTransport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>>;
}

#[derive(Debug, Clone)]
pub(crate) struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub(crate) fn new(
        timeout: Option<Duration>,
        user_agent: Option<&str>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent.to_owned());
        }
        let client = builder.build().map_err(TransportError::from)?;
        Ok(Self { client })
    }

    pub(crate) fn shared(
        timeout: Option<Duration>,
        user_agent: Option<&str>,
    ) -> Result<Arc<dyn HttpTransport>, TransportError> {
        Ok(Arc::new(Self::new(timeout, user_agent)?))
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url).json(&request.body);
            match request.auth {
                Some(HttpAuth::Bearer(token)) => builder = builder.bearer_auth(token),
                Some(HttpAuth::Basic { username, password }) => {
                    builder = builder.basic_auth(username, Some(password));
                }
                None => {}
            }
            for (name, value) in request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}
