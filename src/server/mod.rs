//! HTTP adaptation of flow outcomes.
//!
//! Error and token bodies are JSON and carry `Cache-Control: no-store`, as
//! required by [RFC 6749 Section 5.1][rfc6749-5.1]. Authorization errors
//! detected once the redirect URI is trusted are sent back to the client as
//! [error redirects][rfc6749-4.1.2.1].
//!
//! [rfc6749-5.1]: https://datatracker.ietf.org/doc/html/rfc6749#section-5.1
//! [rfc6749-4.1.2.1]: https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1
use http::{
	HeaderValue, Response, StatusCode,
	header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA},
};
use iref::UriBuf;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
	StateBuf, Stateful,
	error::{ErrorKind, OAuthError, OAuthResult},
	util::extend_uri_query,
};

#[cfg(feature = "axum")]
mod axum;
pub mod metadata;

pub use metadata::AuthorizationServerMetadata;

/// `Content-Type: application/json` header value.
pub const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

const NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache");

/// An OAuth 2.0 error response.
///
/// This is the error format of authorization redirects, as defined in
/// [RFC 6749 Section 4.1.2.1](https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1).
/// Token endpoint errors use the serialized [`OAuthError`] instead, which
/// also carries the HTTP status.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorResponse<T = ErrorKind> {
	/// A single error code string.
	pub error: T,

	/// Human-readable text providing additional information about the error.
	pub error_description: Option<String>,

	/// A URI identifying a human-readable web page with information about
	/// the error.
	pub error_uri: Option<UriBuf>,
}

impl<T> ErrorResponse<T> {
	pub fn new(error: T, error_description: Option<String>, error_uri: Option<UriBuf>) -> Self {
		Self {
			error,
			error_description,
			error_uri,
		}
	}
}

impl From<&OAuthError> for ErrorResponse {
	fn from(value: &OAuthError) -> Self {
		Self::new(value.kind(), Some(value.description().to_owned()), None)
	}
}

/// Builds a JSON response that must not be cached.
pub fn json_response<T>(status: StatusCode, body: &T) -> OAuthResult<Response<Vec<u8>>>
where
	T: ?Sized + Serialize,
{
	let body = serde_json::to_vec(body)
		.map_err(|e| OAuthError::server_error(format!("unable to encode response: {e}")))?;

	Response::builder()
		.status(status)
		.header(CONTENT_TYPE, APPLICATION_JSON)
		.header(CACHE_CONTROL, NO_STORE)
		.header(PRAGMA, NO_CACHE)
		.body(body)
		.map_err(|e| OAuthError::server_error(format!("unable to build response: {e}")))
}

/// Successful token endpoint response.
pub fn token_response<T: Serialize>(token: &T) -> OAuthResult<Response<Vec<u8>>> {
	json_response(StatusCode::OK, token)
}

/// Error response, with the status of the error kind.
///
/// Falls back to an empty `500` if the error cannot be encoded.
pub fn error_response(error: &OAuthError) -> Response<Vec<u8>> {
	json_response(error.status(), error).unwrap_or_else(|_| {
		let mut response = Response::new(Vec::new());
		*response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
		response
	})
}

/// Builds the redirect sending `error` back to the client.
///
/// Only redirect to a URI validated against the client policy: errors about
/// the redirect URI itself must be shown to the user instead.
pub fn error_redirect(
	error: &OAuthError,
	redirect_uri: &str,
	state: Option<StateBuf>,
) -> OAuthResult<UriBuf> {
	let mut uri = UriBuf::new(redirect_uri.as_bytes().to_vec())
		.map_err(|_| OAuthError::invalid_request("malformed `redirect_uri`"))?;

	extend_uri_query(&mut uri, Stateful::new(ErrorResponse::from(error), state))?;
	Ok(uri)
}
