//! client configuration
//!
//! build a [`ClientConfig`] with the endpoint url and optional overrides.
//! pass it to [`crate::Client::new`] to create a client.

use crate::error::{Error, Result};
use crate::transport::Transport;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use url::Url;

/// debug line sink
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// configuration for the graphql client
#[derive(Clone)]
pub struct ClientConfig {
    /// original endpoint input
    pub(crate) raw_url: String,

    /// parsed endpoint, `None` if the input did not parse
    pub(crate) url: Option<Url>,

    /// transport override (default: a pooling `reqwest::Client`)
    pub(crate) transport: Option<Arc<dyn Transport>>,

    /// send multipart/form-data instead of json
    pub(crate) multipart_form: bool,

    /// ask for the connection to be closed after each request
    pub(crate) close_request: bool,

    /// headers sent with every request
    pub(crate) extra_headers: HeaderMap,

    /// debug line sink
    pub(crate) log: Option<LogFn>,
}

impl ClientConfig {
    /// create a new client configuration
    ///
    /// # arguments
    ///
    /// * `url` - the graphql endpoint (e.g., "<https://api.example.com/graphql>")
    ///
    /// # example
    ///
    /// ```
    /// use graphql_http::ClientConfig;
    ///
    /// let config = ClientConfig::new("https://api.example.com/graphql")
    ///     .with_multipart_form(true)
    ///     .with_log(|line| eprintln!("{line}"));
    /// ```
    pub fn new(url: impl AsRef<str>) -> Self {
        let raw_url = url.as_ref().to_string();

        Self {
            url: Url::parse(raw_url.trim()).ok(),
            raw_url,
            transport: None,
            multipart_form: false,
            close_request: false,
            extra_headers: HeaderMap::new(),
            log: None,
        }
    }

    /// send requests through a custom transport
    ///
    /// the transport is shared by every call made through the client.
    pub fn with_transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// use multipart/form-data bodies, required for file uploads
    ///
    /// default: disabled (json bodies)
    pub fn with_multipart_form(mut self, enabled: bool) -> Self {
        self.multipart_form = enabled;
        self
    }

    /// close the connection after each request instead of returning it to
    /// the pool
    ///
    /// default: disabled
    pub fn with_close_request(mut self, enabled: bool) -> Self {
        self.close_request = enabled;
        self
    }

    /// add a header to every request
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.append(name, value);
        self
    }

    /// add a set of headers to every request
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.extra_headers.append(name.clone(), value.clone());
        }
        self
    }

    /// receive debug lines for outgoing and incoming payloads
    ///
    /// default: discarded
    pub fn with_log<F>(mut self, log: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(log));
        self
    }

    /// access extra headers configured on this client
    pub fn extra_headers(&self) -> &HeaderMap {
        &self.extra_headers
    }

    /// true if requests are sent as multipart/form-data
    pub fn multipart_form(&self) -> bool {
        self.multipart_form
    }

    /// validate the configuration and return the endpoint
    pub(crate) fn validate(&self) -> Result<&Url> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| Error::Config(format!("invalid endpoint url: {}", self.raw_url)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "invalid url scheme: {}. must be http or https",
                url.scheme()
            )));
        }

        Ok(url)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.raw_url)
            .field("transport", &self.transport.is_some())
            .field("multipart_form", &self.multipart_form)
            .field("close_request", &self.close_request)
            .field("extra_headers", &self.extra_headers.len())
            .field("log", &self.log.is_some())
            .finish()
    }
}
