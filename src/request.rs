//! graphql request
//!
//! query text, variables, file attachments, and per-request headers.

use crate::error::{Error, Result};
use crate::operation::Operation;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use tokio::io::AsyncRead;

/// variable name to value mapping
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// a graphql request
///
/// the query is opaque text; it is never parsed here.
///
/// ```
/// use graphql_http::Request;
///
/// let mut request = Request::new("query ($id: ID!) { item(id: $id) { name } }");
/// request.var("id", "42");
/// assert_eq!(request.vars().unwrap()["id"], "42");
/// ```
pub struct Request {
    query: String,
    vars: Option<Variables>,
    files: Vec<Attachment>,
    headers: HeaderMap,
}

impl Request {
    /// create a request for a query or mutation
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            vars: None,
            files: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    /// create a request for a generated operation
    pub fn from_operation<O: Operation>() -> Self {
        Self::new(O::QUERY)
    }

    /// set a variable, replacing any previous value under the same name
    pub fn var(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.vars
            .get_or_insert_with(Variables::new)
            .insert(name.into(), value.into());
    }

    /// set a variable from any serializable value
    pub fn try_var<T>(&mut self, name: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(|err| Error::encode("encode variable", err))?;
        self.var(name, value);
        Ok(())
    }

    /// attach a file to upload
    ///
    /// only a client in multipart form mode can send files. the reader is
    /// consumed once, when the request is encoded.
    pub fn file<R>(&mut self, field: impl Into<String>, name: impl Into<String>, reader: R)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.files.push(Attachment {
            field: field.into(),
            name: name.into(),
            reader: Box::new(reader),
        });
    }

    /// attach an in-memory file to upload
    pub fn file_bytes(
        &mut self,
        field: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Bytes>,
    ) {
        self.file(field, name, Cursor::new(content.into()));
    }

    /// query text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// variables, or `None` if no variable was ever set
    pub fn vars(&self) -> Option<&Variables> {
        self.vars.as_ref()
    }

    /// attached files, in attachment order
    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    pub(crate) fn files_mut(&mut self) -> &mut [Attachment] {
        &mut self.files
    }

    /// headers added to the outgoing http request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// mutable access to the per-request headers
    ///
    /// use `append` to send several values under one name.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("vars", &self.vars)
            .field("files", &self.files)
            .field("headers", &self.headers)
            .finish()
    }
}

/// a file bound to a multipart form field
pub struct Attachment {
    field: String,
    name: String,
    pub(crate) reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl Attachment {
    /// form field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// file name sent with the part
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("field", &self.field)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
