//! request body encoders
//!
//! json mode sends `{"query": .., "variables": ..}`. multipart mode sends a
//! `query` field, an optional `variables` field holding json text, and one
//! file part per attachment.

use crate::error::{Error, Result};
use crate::request::{Request, Variables};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::HeaderValue;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// content type of json request bodies, also sent as `Accept`
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// an encoded request body and the content type that describes it
#[derive(Debug, Clone)]
pub struct EncodedBody {
    pub content_type: HeaderValue,
    pub body: Bytes,
    /// variables text as it went into the body, empty if it was left out
    pub variables: String,
}

#[derive(Serialize)]
struct JsonBody<'a> {
    query: &'a str,
    variables: Option<&'a Variables>,
}

/// encode a request as a json document
///
/// absent variables are sent as `null`; the key is always present.
pub fn json_body(request: &Request) -> Result<EncodedBody> {
    let body = serde_json::to_vec(&JsonBody {
        query: request.query(),
        variables: request.vars(),
    })
    .map_err(|err| Error::encode("encode body", err))?;
    let variables = serde_json::to_string(&request.vars())
        .map_err(|err| Error::encode("encode variables", err))?;

    Ok(EncodedBody {
        content_type: HeaderValue::from_static(JSON_CONTENT_TYPE),
        body: Bytes::from(body),
        variables,
    })
}

/// encode a request as multipart/form-data
///
/// every attachment stream is read to the end and the form is fully
/// rendered here, so a failing reader aborts before anything is sent.
/// field and file names must not contain control characters.
pub async fn multipart_body(request: &mut Request) -> Result<EncodedBody> {
    let mut form = Form::new().text("query", request.query().to_string());

    let mut variables = String::new();
    if let Some(vars) = request.vars().filter(|vars| !vars.is_empty()) {
        variables =
            serde_json::to_string(vars).map_err(|err| Error::encode("encode variables", err))?;
        form = form.text("variables", variables.clone());
    }

    for file in request.files_mut() {
        check_part_name("field name", file.field())?;
        check_part_name("file name", file.name())?;

        let mut content = Vec::new();
        file.reader
            .read_to_end(&mut content)
            .await
            .map_err(|err| Error::encode("preparing file", err))?;

        let part = Part::bytes(content)
            .file_name(file.name().to_string())
            .mime_str(FILE_CONTENT_TYPE)
            .map_err(|err| Error::encode("create form file", err))?;
        form = form.part(file.field().to_string(), part);
    }

    let content_type =
        HeaderValue::from_str(&format!("multipart/form-data; boundary={}", form.boundary()))
            .map_err(|err| Error::encode("close writer", err))?;

    let mut body = Vec::new();
    let mut stream = std::pin::pin!(form.into_stream());
    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|err| Error::encode("close writer", err))?
    {
        body.extend_from_slice(&chunk);
    }

    Ok(EncodedBody {
        content_type,
        body: Bytes::from(body),
        variables,
    })
}

// a raw CR or LF would end the part's Content-Disposition header early
fn check_part_name(kind: &str, value: &str) -> Result<()> {
    if value.chars().any(char::is_control) {
        return Err(Error::encode(
            "create form file",
            format!("{kind} contains control characters: {value:?}"),
        ));
    }
    Ok(())
}
