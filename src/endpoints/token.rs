//! Token endpoint.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-3.2>
use std::fmt::Display;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_with::skip_serializing_none;

use crate::{AccessTokenBuf, RefreshTokenBuf, ScopeBuf, error::OAuthResult, util::NoExtension};

/// Access token type issued by [`TokenResponse::bearer`].
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Token request, as received on the token endpoint.
///
/// Holds the union of the parameters of every supported grant. Which ones
/// are required depends on the `grant_type`, and is checked by the
/// corresponding flow.
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
	pub grant_type: Option<String>,

	pub client_id: Option<String>,

	pub client_secret: Option<String>,

	/// Requested scopes, space-separated.
	pub scope: Option<String>,

	// authorization_code
	pub code: Option<String>,
	pub redirect_uri: Option<String>,
	pub code_verifier: Option<String>,

	// password
	pub username: Option<String>,
	pub password: Option<String>,

	// refresh_token
	pub refresh_token: Option<String>,

	// device_code
	pub device_code: Option<String>,
}

impl TokenRequest {
	/// Creates an empty request for the given grant type.
	pub fn new(grant_type: impl Into<String>) -> Self {
		Self {
			grant_type: Some(grant_type.into()),
			..Default::default()
		}
	}

	/// Decodes a token request from a form-urlencoded body.
	pub fn from_form(body: &str) -> OAuthResult<Self> {
		super::decode_form(body)
	}
}

pub trait TokenType: Serialize + DeserializeOwned + Display {}

impl TokenType for String {}

/// Successful token response.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-5.1>
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(bound(
	serialize = "T: TokenType, E: Serialize",
	deserialize = "T: TokenType, E: Deserialize<'de>"
))]
pub struct TokenResponse<T: TokenType = String, E = NoExtension> {
	pub access_token: AccessTokenBuf,

	/// Value is case insensitive.
	pub token_type: T,

	/// Lifetime in seconds of the access token.
	pub expires_in: Option<u64>,

	pub refresh_token: Option<RefreshTokenBuf>,

	/// Optional if identical to the scope requested by the client.
	pub scope: Option<ScopeBuf>,

	#[serde(flatten)]
	pub ext: E,
}

impl<T, E> TokenResponse<T, E>
where
	T: TokenType,
{
	pub fn new(access_token: AccessTokenBuf, token_type: T, ext: E) -> Self {
		Self {
			access_token,
			token_type,
			expires_in: None,
			refresh_token: None,
			scope: None,
			ext,
		}
	}

	pub fn with_expires_in(self, expires_in: u64) -> Self {
		Self {
			expires_in: Some(expires_in),
			..self
		}
	}

	pub fn with_refresh_token(self, refresh_token: RefreshTokenBuf) -> Self {
		Self {
			refresh_token: Some(refresh_token),
			..self
		}
	}

	pub fn with_scope(self, scope: Option<ScopeBuf>) -> Self {
		Self { scope, ..self }
	}
}

impl TokenResponse {
	/// Creates a bearer token response without extension.
	pub fn bearer(access_token: AccessTokenBuf) -> Self {
		Self::new(access_token, TOKEN_TYPE_BEARER.to_owned(), NoExtension {})
	}
}
