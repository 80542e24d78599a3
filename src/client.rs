//! main client
//!
//! encodes a [`Request`], sends it through the configured transport, and
//! decodes the graphql response envelope.

use crate::config::ClientConfig;
use crate::encode::{self, EncodedBody, JSON_CONTENT_TYPE};
use crate::error::{Error, Result};
use crate::graphql::GraphQlResponse;
use crate::operation::Operation;
use crate::request::Request;
use crate::transport::Transport;
use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// graphql client
///
/// configuration is fixed at construction, so a client can be cloned and
/// shared across tasks freely.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    url: Url,
    transport: Arc<dyn Transport>,
}

/// outcome of [`Client::run_split`]
#[derive(Debug, Clone)]
pub enum SplitResponse<T, E> {
    /// the server answered 200 and the envelope decoded
    Data(GraphQlResponse<T>),
    /// the server answered with another status; the body decoded as `E`
    Error { status: StatusCode, error: E },
}

impl Client {
    /// create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let url = config.validate()?.clone();

        let transport = match &config.transport {
            Some(transport) => transport.clone(),
            None => {
                let http = reqwest::Client::builder()
                    .build()
                    .map_err(|err| Error::Config(format!("http client: {err}")))?;
                Arc::new(http) as Arc<dyn Transport>
            }
        };

        Ok(Self {
            config: Arc::new(config),
            url,
            transport,
        })
    }

    /// access the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// run a request and decode `data` into `T`
    ///
    /// graphql errors reported with a 200 response fail the call with
    /// [`Error::GraphQl`], which keeps the full error list. a non-200 status
    /// always fails with [`Error::Status`], even when the body parsed.
    ///
    /// attachment readers are consumed, so a request with files can only be
    /// run once.
    pub async fn run<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        request: &mut Request,
    ) -> Result<GraphQlResponse<T>> {
        let (status, body) = self.execute(cancel, request).await?;
        decode_response(status, &body)
    }

    /// run a request built for a typed operation
    pub async fn run_operation<O: Operation>(
        &self,
        cancel: &CancellationToken,
        request: &mut Request,
    ) -> Result<GraphQlResponse<O::Response>> {
        self.run(cancel, request).await
    }

    /// run a request, decoding non-200 bodies into a caller-defined error
    /// shape instead of failing
    ///
    /// if a non-200 body does not decode as `E`, the call fails with
    /// [`Error::Status`].
    pub async fn run_split<T, E>(
        &self,
        cancel: &CancellationToken,
        request: &mut Request,
    ) -> Result<SplitResponse<T, E>>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let (status, body) = self.execute(cancel, request).await?;
        if status != StatusCode::OK {
            return match serde_json::from_slice::<E>(&body) {
                Ok(error) => Ok(SplitResponse::Error { status, error }),
                Err(_) => Err(status_error(status, &body)),
            };
        }
        decode_response(status, &body).map(SplitResponse::Data)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &mut Request,
    ) -> Result<(StatusCode, Bytes)> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !request.files().is_empty() && !self.config.multipart_form {
            return Err(Error::MultipartRequired);
        }

        let encoded = if self.config.multipart_form {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                encoded = encode::multipart_body(request) => encoded?,
            }
        } else {
            encode::json_body(request)?
        };

        self.logf(format_args!(">> variables: {}", encoded.variables));
        if self.config.multipart_form {
            self.logf(format_args!(">> files: {}", request.files().len()));
        }
        self.logf(format_args!(">> query: {}", request.query()));
        trace!(
            variables = %encoded.variables,
            query = request.query(),
            "outgoing graphql payload"
        );

        let http_request = self.build_request(request, encoded);
        self.logf(format_args!(">> headers: {:?}", http_request.headers()));

        debug!(
            url = %self.url,
            multipart = self.config.multipart_form,
            files = request.files().len(),
            "sending graphql request"
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.transport.send(http_request) => response.map_err(Error::Transport)?,
        };
        let status = response.status();

        // dropping the response on any exit path releases the body
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.bytes() => body.map_err(Error::BodyRead)?,
        };

        let text = String::from_utf8_lossy(&body);
        self.logf(format_args!("<< {text}"));
        trace!(body = %text, "incoming graphql payload");
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            "received graphql response"
        );

        Ok((status, body))
    }

    fn build_request(&self, request: &Request, encoded: EncodedBody) -> reqwest::Request {
        let mut http_request = reqwest::Request::new(Method::POST, self.url.clone());

        let headers = http_request.headers_mut();
        for (name, value) in self.config.extra_headers.iter().chain(request.headers().iter()) {
            headers.append(name.clone(), value.clone());
        }
        headers.insert(CONTENT_TYPE, encoded.content_type);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if self.config.close_request {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        *http_request.body_mut() = Some(reqwest::Body::from(encoded.body));
        http_request
    }

    fn logf(&self, args: fmt::Arguments<'_>) {
        if let Some(log) = &self.config.log {
            log(&args.to_string());
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> Error {
    let errors = serde_json::from_slice::<GraphQlResponse<serde_json::Value>>(body)
        .map(|parsed| parsed.errors)
        .unwrap_or_default();
    Error::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
        errors,
    }
}

fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<GraphQlResponse<T>> {
    if status != StatusCode::OK {
        return Err(status_error(status, body));
    }

    let parsed: GraphQlResponse<serde_json::Value> =
        serde_json::from_slice(body).map_err(Error::Decode)?;
    if parsed.has_errors() {
        return Err(Error::GraphQl {
            errors: parsed.errors,
            data: parsed.data,
        });
    }

    let data = parsed
        .data
        .map(serde_json::from_value)
        .transpose()
        .map_err(Error::Decode)?;
    Ok(GraphQlResponse {
        data,
        errors: parsed.errors,
    })
}
