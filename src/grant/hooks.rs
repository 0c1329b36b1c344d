//! Integration points between the grant flows and the embedding server.
//!
//! The flows only validate and orchestrate: minting tokens, persisting
//! codes and authenticating resource owners is left to the implementor of
//! these traits. Every flow requires [`TokenHooks`] plus the hook trait of
//! its own grant.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
	AccessToken, ClientIdBuf, Code, CodeBuf, DeviceCode, DeviceCodeBuf, GrantType, RefreshToken,
	RefreshTokenBuf, ScopeTokenBuf,
	error::{ErrorKind, OAuthError, OAuthResult},
	ext::pkce::PkceCodeChallengeAndMethod,
	policy::{ClientPolicy, expires_at},
};

use super::device_code::DeviceCodeStatus;

/// Everything known about a grant once it has been validated, handed to
/// [`TokenHooks::generate_token`].
#[derive(Debug)]
pub struct TokenGrant<'a, I> {
	/// Policy of the client the token is issued to.
	pub client: &'a ClientPolicy,

	pub grant_type: GrantType,

	/// Granted scopes, in request order.
	pub scopes: Vec<ScopeTokenBuf>,

	/// Data attached to the grant by the hooks (code info, resource owner,
	/// ...).
	pub info: Option<I>,

	pub expires_in: u64,

	pub expires_at: DateTime<Utc>,

	/// Set when a refresh token must be issued alongside the access token.
	pub refresh_token: Option<RefreshTokenIssuance>,
}

impl<'a, I> TokenGrant<'a, I> {
	/// Prepares the issuance of an access token for `client`, with an
	/// expiry derived from its policy.
	///
	/// A refresh token issuance is attached when `with_refresh_token` is
	/// set.
	pub fn new(
		client: &'a ClientPolicy,
		grant_type: GrantType,
		scopes: Vec<ScopeTokenBuf>,
		info: Option<I>,
		with_refresh_token: bool,
	) -> OAuthResult<Self> {
		let refresh_token = if with_refresh_token {
			Some(RefreshTokenIssuance::new(client.refresh_token_expires_in(), None)?)
		} else {
			None
		};

		Ok(Self {
			client,
			grant_type,
			scopes,
			info,
			expires_in: client.token_expires_in(),
			expires_at: expires_at(client.token_expires_in())?,
			refresh_token,
		})
	}
}

/// Refresh token to be issued with an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenIssuance {
	pub expires_in: u64,

	pub expires_at: DateTime<Utc>,

	/// Token already minted by [`RefreshTokenHooks::issue_new_refresh_token`].
	///
	/// When `None`, [`TokenHooks::generate_token`] mints it.
	pub token: Option<RefreshTokenBuf>,
}

impl RefreshTokenIssuance {
	pub fn new(expires_in: u64, token: Option<RefreshTokenBuf>) -> OAuthResult<Self> {
		Ok(Self {
			expires_in,
			expires_at: expires_at(expires_in)?,
			token,
		})
	}
}

/// Token minting, shared by every grant.
pub trait TokenHooks {
	/// Data the hooks attach to a grant.
	type Info;

	/// Token response produced on success.
	type Token;

	/// Mints the access token (and refresh token, if requested) for a
	/// validated grant.
	#[allow(async_fn_in_trait)]
	async fn generate_token(&self, grant: TokenGrant<'_, Self::Info>) -> OAuthResult<Self::Token>;

	/// Validates an access token previously minted by
	/// [`Self::generate_token`], returning the data attached to its grant.
	///
	/// Not used by the flows. Fails with `not_implemented` unless
	/// overridden.
	#[allow(async_fn_in_trait)]
	async fn validate_token(&self, token: &AccessToken) -> OAuthResult<Self::Info> {
		let _ = token;
		Err(OAuthError::with_description(
			ErrorKind::NotImplemented,
			"access token validation is not implemented",
		))
	}
}

/// Authorization code issued by [`AuthorizationCodeHooks::generate_code`].
#[derive(Debug)]
pub struct CodeIssuance<'a, I> {
	pub client: &'a ClientPolicy,

	/// Granted scopes, in request order.
	pub scopes: Vec<ScopeTokenBuf>,

	/// Redirect URI sent with the authorization request, which the token
	/// request must repeat.
	pub redirect_uri: Option<String>,

	/// PKCE challenge the code is bound to.
	pub pkce: Option<PkceCodeChallengeAndMethod>,

	pub code_info: I,

	pub expires_at: DateTime<Utc>,
}

/// Stored state of an authorization code, returned by
/// [`AuthorizationCodeHooks::validate_code`].
///
/// The PKCE challenge and method are kept as raw strings: they are checked
/// again when the code is redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeValidation<I> {
	pub client_id: ClientIdBuf,

	pub scopes: Vec<ScopeTokenBuf>,

	pub redirect_uri: Option<String>,

	pub code_challenge: Option<String>,

	pub code_challenge_method: Option<String>,

	pub code_info: I,

	pub expires_at: DateTime<Utc>,
}

impl<I> CodeValidation<I> {
	/// Builds the stored state of a freshly issued code.
	pub fn from_issuance(issuance: CodeIssuance<'_, I>) -> Self {
		let (code_challenge, code_challenge_method) = match issuance.pkce {
			Some(pkce) => (
				Some(pkce.challenge.as_str().to_owned()),
				Some(pkce.method.as_str().to_owned()),
			),
			None => (None, None),
		};

		Self {
			client_id: issuance.client.client_id().to_owned(),
			scopes: issuance.scopes,
			redirect_uri: issuance.redirect_uri,
			code_challenge,
			code_challenge_method,
			code_info: issuance.code_info,
			expires_at: issuance.expires_at,
		}
	}
}

/// Hooks of the authorization code grant.
pub trait AuthorizationCodeHooks: TokenHooks {
	/// Mints and stores an authorization code.
	#[allow(async_fn_in_trait)]
	async fn generate_code(&self, issuance: CodeIssuance<'_, Self::Info>) -> OAuthResult<CodeBuf>;

	/// Looks up a code and consumes it.
	///
	/// Codes are single use: implementations must fail with
	/// `invalid_grant` when the code is unknown or was already redeemed.
	#[allow(async_fn_in_trait)]
	async fn validate_code(&self, code: &Code) -> OAuthResult<CodeValidation<Self::Info>>;
}

/// Hooks of the resource owner password credentials grant.
pub trait PasswordHooks: TokenHooks {
	/// Authenticates the resource owner, returning the data to attach to
	/// the grant.
	///
	/// Implementations should fail with `invalid_grant` on bad
	/// credentials.
	#[allow(async_fn_in_trait)]
	async fn verify_resource_owner(
		&self,
		client: &ClientPolicy,
		username: &str,
		password: &str,
	) -> OAuthResult<Self::Info>;
}

/// Stored state of a refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshGrant<I> {
	pub client_id: ClientIdBuf,

	/// Scopes of the original grant. A refresh may narrow them, never
	/// widen them.
	pub scopes: Vec<ScopeTokenBuf>,

	pub info: Option<I>,

	pub expires_at: Option<DateTime<Utc>>,
}

/// Hooks of the refresh token grant.
pub trait RefreshTokenHooks: TokenHooks {
	#[allow(async_fn_in_trait)]
	async fn validate_refresh_token(
		&self,
		token: &RefreshToken,
	) -> OAuthResult<RefreshGrant<Self::Info>>;

	/// Rotates the refresh token.
	///
	/// Returning `Some` replaces the presented refresh token. The presented
	/// token must stay valid here: it is only handed to
	/// [`revoke_refresh_token`](Self::revoke_refresh_token) once the new
	/// access token is minted. The default issues none.
	#[allow(async_fn_in_trait)]
	async fn issue_new_refresh_token(
		&self,
		prior: &RefreshGrant<Self::Info>,
	) -> OAuthResult<Option<RefreshTokenBuf>> {
		let _ = prior;
		Ok(None)
	}

	/// Revokes a refresh token replaced by
	/// [`issue_new_refresh_token`](Self::issue_new_refresh_token).
	///
	/// Called after [`TokenHooks::generate_token`] succeeds, so a failed
	/// exchange leaves the presented token usable.
	#[allow(async_fn_in_trait)]
	async fn revoke_refresh_token(&self, token: &RefreshToken) -> OAuthResult<()> {
		let _ = token;
		Ok(())
	}
}

/// Device authorization session opened by
/// [`DeviceCodeHooks::generate_device_code`].
#[derive(Debug)]
pub struct DeviceCodeIssuance<'a, I> {
	pub client: &'a ClientPolicy,

	pub scopes: Vec<ScopeTokenBuf>,

	/// Code the user enters on the verification page.
	pub user_code: String,

	pub interval: u64,

	pub expires_at: DateTime<Utc>,

	pub device_code_info: Option<I>,
}

/// Current state of a device authorization session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCodeValidation<I> {
	pub status: DeviceCodeStatus,

	pub client_id: ClientIdBuf,

	pub scopes: Vec<ScopeTokenBuf>,

	pub info: Option<I>,
}

/// Hooks of the device authorization grant.
pub trait DeviceCodeHooks: TokenHooks {
	/// Mints a device code and stores the pending session.
	#[allow(async_fn_in_trait)]
	async fn generate_device_code(
		&self,
		issuance: DeviceCodeIssuance<'_, Self::Info>,
	) -> OAuthResult<DeviceCodeBuf>;

	/// Returns the session of a device code.
	///
	/// Implementations report the user's decision through
	/// [`DeviceCodeValidation::status`], and should consume the session
	/// once it is approved.
	#[allow(async_fn_in_trait)]
	async fn validate_device_code(
		&self,
		device_code: &DeviceCode,
	) -> OAuthResult<DeviceCodeValidation<Self::Info>>;
}
