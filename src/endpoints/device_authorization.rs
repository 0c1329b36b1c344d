//! Device authorization endpoint.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc8628#section-3.1>
use iref::UriBuf;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{DeviceCodeBuf, error::OAuthResult};

/// Device Authorization Request.
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuthorizationRequest {
	pub client_id: Option<String>,

	/// Requested scopes, space-separated.
	pub scope: Option<String>,
}

impl DeviceAuthorizationRequest {
	/// Decodes a device authorization request from a form-urlencoded body.
	pub fn from_form(body: &str) -> OAuthResult<Self> {
		super::decode_form(body)
	}
}

/// Device Authorization Response.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc8628#section-3.2>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
	/// Code the device polls the token endpoint with.
	pub device_code: DeviceCodeBuf,

	/// Short code the user types at the verification URI.
	pub user_code: String,

	pub verification_uri: UriBuf,

	/// Verification URI with the user code already filled in.
	pub verification_uri_complete: UriBuf,

	/// Lifetime in seconds of the device and user codes.
	pub expires_in: u64,

	/// Minimum number of seconds between two polling requests.
	pub interval: u64,
}
