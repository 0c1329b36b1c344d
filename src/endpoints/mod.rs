//! Wire shapes of the authorization, token and device authorization
//! endpoints.
//!
//! Requests are decoded from `application/x-www-form-urlencoded` input
//! (query strings or form bodies). Every parameter is optional at this
//! level: presence rules are enforced by the grant flows so that a missing
//! parameter maps to the right OAuth error.
use serde::de::DeserializeOwned;

use crate::error::{OAuthError, OAuthResult};

pub mod authorization;
pub mod device_authorization;
pub mod token;

/// Decodes a form-urlencoded request, mapping malformed input to
/// `invalid_request`.
fn decode_form<T: DeserializeOwned>(input: &str) -> OAuthResult<T> {
	serde_html_form::from_str(input.strip_prefix('?').unwrap_or(input))
		.map_err(|e| OAuthError::invalid_request(format!("malformed request parameters: {e}")))
}
