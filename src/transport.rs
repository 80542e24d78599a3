//! transport adapter
//!
//! the client hands a fully built http request to a [`Transport`] and gets a
//! response back. `reqwest::Client` is the default; tests and proxies can
//! plug in anything else.

use crate::error::BoxError;
use async_trait::async_trait;
use std::sync::Arc;

/// sends one http request and returns the response
///
/// a client shares its transport across concurrent calls, so
/// implementations must be safe to use from several tasks at once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        Ok(self.execute(request).await?)
    }
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        (**self).send(request).await
    }
}
