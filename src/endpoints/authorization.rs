//! Authorization endpoint.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.1>
use iref::UriBuf;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
	Code, CodeBuf, StateBuf, Stateful,
	error::{OAuthError, OAuthResult},
	util::extend_uri_query,
};

/// The only response type handled by the authorization code flow.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Authorization Request.
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	pub response_type: Option<String>,

	pub client_id: Option<String>,

	pub redirect_uri: Option<String>,

	/// Requested scopes, space-separated.
	pub scope: Option<String>,

	pub state: Option<StateBuf>,

	pub code_challenge: Option<String>,

	pub code_challenge_method: Option<String>,
}

impl AuthorizationRequest {
	/// Decodes an authorization request from its URI query.
	pub fn from_query(query: &str) -> OAuthResult<Self> {
		super::decode_form(query)
	}
}

/// Successful authorization, to be sent back to the client's redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
	/// Code produced by the code issuance hook.
	pub code: CodeBuf,

	/// The state sent by the client, echoed back.
	pub state: Option<StateBuf>,

	/// Registered URI to redirect the user-agent to, if one could be
	/// determined.
	pub redirect_uri: Option<String>,
}

#[derive(Serialize)]
struct CodeParams<'a> {
	code: &'a Code,
}

impl AuthorizationResponse {
	/// Builds the redirect URI carrying the `code` and `state` parameters,
	/// preserving the query of the registered URI.
	pub fn redirect_uri(&self) -> OAuthResult<UriBuf> {
		let target = self
			.redirect_uri
			.as_deref()
			.ok_or_else(|| OAuthError::invalid_request("no redirect URI to send the code to"))?;

		let mut uri = UriBuf::new(target.as_bytes().to_vec())
			.map_err(|_| OAuthError::invalid_request("malformed `redirect_uri`"))?;

		extend_uri_query(
			&mut uri,
			Stateful::new(CodeParams { code: &self.code }, self.state.clone()),
		)?;

		Ok(uri)
	}
}
