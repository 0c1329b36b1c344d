//! OAuth 2.0 error taxonomy.
//!
//! Every validation failure in this crate maps to exactly one [`ErrorKind`],
//! carried by an [`OAuthError`]. The catalog covers the error codes of
//! [RFC 6749 Section 5.2][rfc6749], [RFC 7636][rfc7636] and
//! [RFC 8628 Section 3.5][rfc8628].
//!
//! [rfc6749]: https://datatracker.ietf.org/doc/html/rfc6749#section-5.2
//! [rfc7636]: https://datatracker.ietf.org/doc/html/rfc7636#section-4.4.1
//! [rfc8628]: https://datatracker.ietf.org/doc/html/rfc8628#section-3.5
use std::{borrow::Cow, fmt, str::FromStr};

use http::StatusCode;
use serde::{Deserialize, Serialize, ser::SerializeStruct};

/// Result type returned by every validation and flow operation.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Error returned when parsing an unknown OAuth error code.
#[derive(Debug, thiserror::Error)]
#[error("unknown OAuth error code `{0}`")]
pub struct UnknownErrorKind(pub String);

/// OAuth error kind.
///
/// The catalog is closed: each kind has a fixed wire code, HTTP status,
/// default description and retryability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
	/// The request is missing a required parameter, includes an invalid
	/// parameter value, or is otherwise malformed.
	InvalidRequest,

	/// Client authentication failed.
	InvalidClient,

	/// The provided authorization grant or refresh token is invalid,
	/// expired, revoked, or was issued to another client.
	InvalidGrant,

	/// The authenticated client is not authorized to use this grant.
	UnauthorizedClient,

	/// The authorization grant type is not supported.
	UnsupportedGrantType,

	/// The requested scope is invalid, unknown, malformed, or exceeds the
	/// scope granted by the resource owner.
	InvalidScope,

	/// The authorization server does not support obtaining an authorization
	/// code using this method.
	UnsupportedResponseType,

	/// The resource owner or authorization server denied the request.
	AccessDenied,

	/// The authorization server encountered an unexpected condition, or is
	/// misconfigured.
	ServerError,

	/// The authorization server is temporarily unable to handle the request.
	TemporarilyUnavailable,

	/// The device authorization request is still pending.
	AuthorizationPending,

	/// The device is polling too fast.
	SlowDown,

	/// The device code has expired.
	ExpiredToken,

	/// The client exceeded its request budget.
	RateLimited,

	/// An optional hook was invoked without being implemented.
	NotImplemented,
}

impl ErrorKind {
	/// Every kind of the catalog.
	pub const ALL: [Self; 15] = [
		Self::InvalidRequest,
		Self::InvalidClient,
		Self::InvalidGrant,
		Self::UnauthorizedClient,
		Self::UnsupportedGrantType,
		Self::InvalidScope,
		Self::UnsupportedResponseType,
		Self::AccessDenied,
		Self::ServerError,
		Self::TemporarilyUnavailable,
		Self::AuthorizationPending,
		Self::SlowDown,
		Self::ExpiredToken,
		Self::RateLimited,
		Self::NotImplemented,
	];

	/// Machine-readable error code, as sent in the `error` field.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::InvalidClient => "invalid_client",
			Self::InvalidGrant => "invalid_grant",
			Self::UnauthorizedClient => "unauthorized_client",
			Self::UnsupportedGrantType => "unsupported_grant_type",
			Self::InvalidScope => "invalid_scope",
			Self::UnsupportedResponseType => "unsupported_response_type",
			Self::AccessDenied => "access_denied",
			Self::ServerError => "server_error",
			Self::TemporarilyUnavailable => "temporarily_unavailable",
			Self::AuthorizationPending => "authorization_pending",
			Self::SlowDown => "slow_down",
			Self::ExpiredToken => "expired_token",
			Self::RateLimited => "rate_limited",
			Self::NotImplemented => "not_implemented",
		}
	}

	/// Default human-readable description.
	pub fn description(&self) -> &'static str {
		match self {
			Self::InvalidRequest => "The request is missing a required parameter or is malformed.",
			Self::InvalidClient => "Client authentication failed.",
			Self::InvalidGrant => "The provided authorization grant is invalid or expired.",
			Self::UnauthorizedClient => "The client is not authorized to use this grant type.",
			Self::UnsupportedGrantType => "The authorization grant type is not supported.",
			Self::InvalidScope => "The requested scope is invalid, unknown, or malformed.",
			Self::UnsupportedResponseType => "The response type is not supported.",
			Self::AccessDenied => "The resource owner denied the request.",
			Self::ServerError => "The authorization server encountered an unexpected condition.",
			Self::TemporarilyUnavailable => "The authorization server is temporarily unavailable.",
			Self::AuthorizationPending => "The authorization request is still pending.",
			Self::SlowDown => "Polling too frequently, slow down.",
			Self::ExpiredToken => "The device code has expired.",
			Self::RateLimited => "Too many requests.",
			Self::NotImplemented => "This operation is not implemented.",
		}
	}

	/// HTTP status code sent with this kind.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::InvalidClient => StatusCode::UNAUTHORIZED,
			Self::AccessDenied => StatusCode::FORBIDDEN,
			Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
			Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
			Self::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
			Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
			_ => StatusCode::BAD_REQUEST,
		}
	}

	/// Returns `true` if the same request may succeed when retried later.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::AuthorizationPending
				| Self::SlowDown
				| Self::TemporarilyUnavailable
				| Self::RateLimited
		)
	}

	/// Returns `true` for the steady-state device polling answers, which
	/// are not failures.
	pub fn is_polling(&self) -> bool {
		matches!(self, Self::AuthorizationPending | Self::SlowDown)
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ErrorKind {
	type Err = UnknownErrorKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| UnknownErrorKind(s.to_owned()))
	}
}

impl Serialize for ErrorKind {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.as_str().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for ErrorKind {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		String::deserialize(deserializer)?
			.parse()
			.map_err(serde::de::Error::custom)
	}
}

/// An OAuth error.
///
/// Created once, never mutated after it leaves this crate, and always
/// terminal for the call that returned it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {description}")]
pub struct OAuthError {
	kind: ErrorKind,
	description: Cow<'static, str>,
	more_info: Option<serde_json::Value>,
}

impl OAuthError {
	/// Creates an error of the given kind with its default description.
	pub fn new(kind: ErrorKind) -> Self {
		Self::build(kind, Cow::Borrowed(kind.description()))
	}

	/// Creates an error of the given kind with a custom description.
	pub fn with_description(kind: ErrorKind, description: impl Into<Cow<'static, str>>) -> Self {
		Self::build(kind, description.into())
	}

	fn build(kind: ErrorKind, description: Cow<'static, str>) -> Self {
		if kind.is_polling() {
			log::trace!("{kind}: {description}");
		} else if kind.status().is_server_error() {
			log::error!("{kind}: {description}");
		} else {
			log::debug!("{kind}: {description}");
		}

		Self {
			kind,
			description,
			more_info: None,
		}
	}

	/// Builds an error from a wire error code.
	///
	/// Unknown codes are not dropped: they degrade to
	/// [`ErrorKind::ServerError`] with the offending code embedded in
	/// `more_info` under `"unknown_error"`.
	pub fn from_code(code: &str, more_info: Option<serde_json::Value>) -> Self {
		match code.parse::<ErrorKind>() {
			Ok(kind) => {
				let error = Self::new(kind);
				match more_info {
					Some(info) => error.with_more_info(info),
					None => error,
				}
			}
			Err(_) => {
				let mut info = serde_json::Map::new();
				info.insert("unknown_error".to_owned(), code.into());
				if let Some(original) = more_info {
					info.insert("more_info".to_owned(), original);
				}

				Self::with_description(
					ErrorKind::ServerError,
					format!("unknown error kind `{code}`"),
				)
				.with_more_info(serde_json::Value::Object(info))
			}
		}
	}

	/// Attaches structured information to the error.
	pub fn with_more_info(self, more_info: serde_json::Value) -> Self {
		Self {
			more_info: Some(more_info),
			..self
		}
	}

	pub fn invalid_request(description: impl Into<Cow<'static, str>>) -> Self {
		Self::with_description(ErrorKind::InvalidRequest, description)
	}

	pub fn invalid_grant(description: impl Into<Cow<'static, str>>) -> Self {
		Self::with_description(ErrorKind::InvalidGrant, description)
	}

	pub fn invalid_scope(description: impl Into<Cow<'static, str>>) -> Self {
		Self::with_description(ErrorKind::InvalidScope, description)
	}

	pub fn server_error(description: impl Into<Cow<'static, str>>) -> Self {
		Self::with_description(ErrorKind::ServerError, description)
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	/// Machine-readable error code.
	pub fn code(&self) -> &'static str {
		self.kind.as_str()
	}

	pub fn status(&self) -> StatusCode {
		self.kind.status()
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	pub fn more_info(&self) -> Option<&serde_json::Value> {
		self.more_info.as_ref()
	}

	pub fn is_retryable(&self) -> bool {
		self.kind.is_retryable()
	}
}

impl From<ErrorKind> for OAuthError {
	fn from(kind: ErrorKind) -> Self {
		Self::new(kind)
	}
}

/// Serializes as the RFC 6749 §5.2 error body, extended with the HTTP
/// `status` and optional `more_info`.
impl Serialize for OAuthError {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		let len = if self.more_info.is_some() { 4 } else { 3 };
		let mut s = serializer.serialize_struct("OAuthError", len)?;
		s.serialize_field("error", &self.kind)?;
		s.serialize_field("error_description", &self.description)?;
		s.serialize_field("status", &self.status().as_u16())?;
		if let Some(more_info) = &self.more_info {
			s.serialize_field("more_info", more_info)?;
		}
		s.end()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn status_codes() {
		assert_eq!(ErrorKind::InvalidRequest.status(), StatusCode::BAD_REQUEST);
		assert_eq!(ErrorKind::InvalidClient.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(ErrorKind::AccessDenied.status(), StatusCode::FORBIDDEN);
		assert_eq!(ErrorKind::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(
			ErrorKind::ServerError.status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(
			ErrorKind::TemporarilyUnavailable.status(),
			StatusCode::SERVICE_UNAVAILABLE
		);
		assert_eq!(ErrorKind::SlowDown.status(), StatusCode::BAD_REQUEST);
		assert_eq!(ErrorKind::ExpiredToken.status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn codes_parse_back() {
		for kind in ErrorKind::ALL {
			assert_eq!(kind.as_str().parse::<ErrorKind>().unwrap(), kind);
		}
	}

	#[test]
	fn retryable_kinds() {
		assert!(ErrorKind::AuthorizationPending.is_retryable());
		assert!(ErrorKind::SlowDown.is_retryable());
		assert!(ErrorKind::TemporarilyUnavailable.is_retryable());
		assert!(ErrorKind::RateLimited.is_retryable());
		assert!(!ErrorKind::InvalidGrant.is_retryable());
		assert!(!ErrorKind::ServerError.is_retryable());
	}

	#[test]
	fn unknown_code_degrades_to_server_error() {
		let error = OAuthError::from_code("made_up_error", Some(json!({ "hint": 1 })));
		assert_eq!(error.kind(), ErrorKind::ServerError);
		assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(
			error.more_info(),
			Some(&json!({ "unknown_error": "made_up_error", "more_info": { "hint": 1 } }))
		);
	}

	#[test]
	fn known_code_keeps_more_info() {
		let error = OAuthError::from_code("slow_down", Some(json!({ "interval": 10 })));
		assert_eq!(error.kind(), ErrorKind::SlowDown);
		assert_eq!(error.more_info(), Some(&json!({ "interval": 10 })));
	}

	#[test]
	fn wire_form() {
		let error = OAuthError::invalid_scope("scope `admin` is not allowed");
		assert_eq!(
			serde_json::to_value(&error).unwrap(),
			json!({
				"error": "invalid_scope",
				"error_description": "scope `admin` is not allowed",
				"status": 400
			})
		);
	}

	#[test]
	fn default_description() {
		let error = OAuthError::new(ErrorKind::AccessDenied);
		assert_eq!(error.description(), ErrorKind::AccessDenied.description());
		assert_eq!(
			error.to_string(),
			"access_denied: The resource owner denied the request."
		);
	}
}
