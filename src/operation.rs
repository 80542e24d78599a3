//! typed operations
//!
//! pairs a fixed query document with the shape of its `data` payload.

use serde::de::DeserializeOwned;

/// graphql operation with a known response shape
///
/// ```
/// use graphql_http::{Operation, Request};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Viewer {
///     login: String,
/// }
///
/// #[derive(Deserialize)]
/// struct ViewerData {
///     viewer: Viewer,
/// }
///
/// struct ViewerQuery;
///
/// impl Operation for ViewerQuery {
///     const QUERY: &'static str = "query { viewer { login } }";
///     type Response = ViewerData;
/// }
///
/// let request = Request::from_operation::<ViewerQuery>();
/// assert_eq!(request.query(), ViewerQuery::QUERY);
/// ```
pub trait Operation {
    /// graphql query or mutation string
    const QUERY: &'static str;
    /// shape of the `data` payload
    type Response: DeserializeOwned;
}
