//! graphql over http
//!
//! this crate provides a small client for sending graphql queries and
//! mutations, either as json or as multipart/form-data with file uploads.
//! build a [`Request`], then run it with a [`Client`] created from a
//! [`ClientConfig`].
//!
//! ## quick start
//!
//! ```no_run
//! use graphql_http::{Client, ClientConfig, Request};
//! use serde::Deserialize;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Deserialize)]
//! struct Data {
//!     version: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(ClientConfig::new("http://localhost:4000/graphql"))?;
//! let mut request = Request::new("query { version }");
//! let response = client
//!     .run::<Data>(&CancellationToken::new(), &mut request)
//!     .await?;
//! println!("{}", response.data.map(|d| d.version).unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! ## file uploads
//!
//! files can only be sent by a client built with
//! [`ClientConfig::with_multipart_form`]; other clients reject the request
//! with [`Error::MultipartRequired`] before touching the network.
//!
//! ## cancellation
//!
//! every call takes a [`tokio_util::sync::CancellationToken`]. cancelling it
//! aborts the call while sending or reading the response and yields
//! [`Error::Cancelled`]. there is no built-in timeout; cancel the token from a
//! timer to bound latency.

mod client;
mod config;
pub mod encode;
mod error;
mod graphql;
mod operation;
mod request;
mod transport;

pub use client::{Client, SplitResponse};
pub use config::{ClientConfig, LogFn};
pub use error::{BoxError, Error, Result};
pub use graphql::{ErrorMessage, GraphQlError, GraphQlLocation, GraphQlResponse, PathSegment};
pub use operation::Operation;
pub use request::{Attachment, Request, Variables};
pub use transport::Transport;
