//! Registered client policy and the validation primitives shared by every
//! grant flow.
//!
//! A [`ClientPolicy`] is built once from a [`ClientRegistration`] and is
//! immutable afterwards: validation never mutates the registered grant types,
//! scopes or redirect URIs.
use std::{
	collections::{BTreeMap, BTreeSet},
	fmt,
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::skip_serializing_none;

use crate::{
	ClientId, ClientIdBuf, GrantType, ScopeTokenBuf, SpaceSeparated, State,
	error::{ErrorKind, OAuthError, OAuthResult},
	parse_scope_tokens,
};

/// Default access token lifetime, in seconds.
pub const DEFAULT_TOKEN_EXPIRES_IN: u64 = 3600;

/// Default refresh token lifetime, in seconds.
pub const DEFAULT_REFRESH_TOKEN_EXPIRES_IN: u64 = 7200;

/// Default authorization code lifetime, in seconds.
pub const DEFAULT_CODE_EXPIRES_IN: u64 = 300;

/// Default device code lifetime, in seconds.
pub const DEFAULT_DEVICE_CODE_EXPIRES_IN: u64 = 1800;

/// Client registration, as configured by the embedding application.
///
/// List fields accept either a space-separated string or a sequence of
/// strings.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
	pub client_id: Option<String>,

	/// Opaque secret, never checked by this crate.
	pub client_secret: Option<String>,

	/// Grant types the client may use.
	///
	/// Leaving this unset is a misconfiguration reported by
	/// [`ClientPolicy::validate_grant_type`].
	pub grant_types: Option<SpaceSeparated>,

	#[serde(default)]
	pub scopes: SpaceSeparated,

	#[serde(default)]
	pub redirect_uris: SpaceSeparated,

	#[serde(default = "default_true")]
	pub issues_refresh_token: bool,

	#[serde(default = "default_true")]
	pub redirect_uri_required: bool,

	#[serde(default)]
	pub scopes_required: bool,

	#[serde(default = "default_true")]
	pub state_required: bool,

	#[serde(default = "default_true")]
	pub match_all_scopes: bool,

	#[serde(default = "default_true")]
	pub pkce_required: bool,

	/// Accept the `plain` PKCE method in addition to `S256`.
	#[serde(default)]
	pub allow_plain_pkce: bool,

	#[serde(default = "default_token_expires_in")]
	pub token_expires_in: u64,

	#[serde(default = "default_refresh_token_expires_in")]
	pub refresh_token_expires_in: u64,

	#[serde(default = "default_code_expires_in")]
	pub code_expires_in: u64,

	#[serde(default = "default_device_code_expires_in")]
	pub device_code_expires_in: u64,
}

fn default_true() -> bool {
	true
}

fn default_token_expires_in() -> u64 {
	DEFAULT_TOKEN_EXPIRES_IN
}

fn default_refresh_token_expires_in() -> u64 {
	DEFAULT_REFRESH_TOKEN_EXPIRES_IN
}

fn default_code_expires_in() -> u64 {
	DEFAULT_CODE_EXPIRES_IN
}

fn default_device_code_expires_in() -> u64 {
	DEFAULT_DEVICE_CODE_EXPIRES_IN
}

impl Default for ClientRegistration {
	fn default() -> Self {
		Self {
			client_id: None,
			client_secret: None,
			grant_types: None,
			scopes: SpaceSeparated::default(),
			redirect_uris: SpaceSeparated::default(),
			issues_refresh_token: true,
			redirect_uri_required: true,
			scopes_required: false,
			state_required: true,
			match_all_scopes: true,
			pkce_required: true,
			allow_plain_pkce: false,
			token_expires_in: DEFAULT_TOKEN_EXPIRES_IN,
			refresh_token_expires_in: DEFAULT_REFRESH_TOKEN_EXPIRES_IN,
			code_expires_in: DEFAULT_CODE_EXPIRES_IN,
			device_code_expires_in: DEFAULT_DEVICE_CODE_EXPIRES_IN,
		}
	}
}

impl ClientRegistration {
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: Some(client_id.into()),
			..Default::default()
		}
	}

	pub fn with_secret(self, client_secret: impl Into<String>) -> Self {
		Self {
			client_secret: Some(client_secret.into()),
			..self
		}
	}

	pub fn with_grant_types(self, grant_types: impl Into<SpaceSeparated>) -> Self {
		Self {
			grant_types: Some(grant_types.into()),
			..self
		}
	}

	pub fn with_scopes(self, scopes: impl Into<SpaceSeparated>) -> Self {
		Self {
			scopes: scopes.into(),
			..self
		}
	}

	pub fn with_redirect_uris(self, redirect_uris: impl Into<SpaceSeparated>) -> Self {
		Self {
			redirect_uris: redirect_uris.into(),
			..self
		}
	}
}

/// Immutable policy of a registered client.
#[derive(Clone)]
pub struct ClientPolicy {
	client_id: ClientIdBuf,
	client_secret: Option<String>,
	grant_types: Option<BTreeSet<GrantType>>,
	scopes: BTreeSet<ScopeTokenBuf>,
	redirect_uris: Vec<String>,
	issues_refresh_token: bool,
	redirect_uri_required: bool,
	scopes_required: bool,
	state_required: bool,
	match_all_scopes: bool,
	pkce_required: bool,
	allow_plain_pkce: bool,
	token_expires_in: u64,
	refresh_token_expires_in: u64,
	code_expires_in: u64,
	device_code_expires_in: u64,
}

impl ClientPolicy {
	/// Builds the policy of a registered client.
	///
	/// Fails with [`ErrorKind::ServerError`] if the registration has no
	/// client identifier or lists a malformed scope.
	pub fn new(registration: ClientRegistration) -> OAuthResult<Self> {
		let client_id = registration
			.client_id
			.filter(|id| !id.is_empty())
			.ok_or_else(|| OAuthError::server_error("client registration has no `client_id`"))?;
		let client_id = ClientIdBuf::new(client_id)
			.map_err(|_| OAuthError::server_error("client registration has a malformed `client_id`"))?;

		let mut scopes = BTreeSet::new();
		for scope in registration.scopes.iter() {
			let token = ScopeTokenBuf::new(scope.clone()).map_err(|_| {
				OAuthError::server_error(format!(
					"client `{}` registers malformed scope `{scope}`",
					client_id.as_str()
				))
			})?;
			scopes.insert(token);
		}

		if registration.allow_plain_pkce {
			log::warn!(
				"client `{}` accepts the `plain` PKCE method",
				client_id.as_str()
			);
		}

		Ok(Self {
			client_id,
			client_secret: registration.client_secret,
			grant_types: registration
				.grant_types
				.map(|names| names.iter().map(|name| GrantType::from(name.as_str())).collect()),
			scopes,
			redirect_uris: registration.redirect_uris.into_vec(),
			issues_refresh_token: registration.issues_refresh_token,
			redirect_uri_required: registration.redirect_uri_required,
			scopes_required: registration.scopes_required,
			state_required: registration.state_required,
			match_all_scopes: registration.match_all_scopes,
			pkce_required: registration.pkce_required,
			allow_plain_pkce: registration.allow_plain_pkce,
			token_expires_in: registration.token_expires_in,
			refresh_token_expires_in: registration.refresh_token_expires_in,
			code_expires_in: registration.code_expires_in,
			device_code_expires_in: registration.device_code_expires_in,
		})
	}

	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	pub fn client_secret(&self) -> Option<&str> {
		self.client_secret.as_deref()
	}

	pub fn grant_types(&self) -> Option<&BTreeSet<GrantType>> {
		self.grant_types.as_ref()
	}

	pub fn scopes(&self) -> &BTreeSet<ScopeTokenBuf> {
		&self.scopes
	}

	pub fn redirect_uris(&self) -> &[String] {
		&self.redirect_uris
	}

	pub fn issues_refresh_token(&self) -> bool {
		self.issues_refresh_token
	}

	pub fn redirect_uri_required(&self) -> bool {
		self.redirect_uri_required
	}

	pub fn scopes_required(&self) -> bool {
		self.scopes_required
	}

	pub fn state_required(&self) -> bool {
		self.state_required
	}

	pub fn match_all_scopes(&self) -> bool {
		self.match_all_scopes
	}

	pub fn pkce_required(&self) -> bool {
		self.pkce_required
	}

	pub fn allows_plain_pkce(&self) -> bool {
		self.allow_plain_pkce
	}

	pub fn token_expires_in(&self) -> u64 {
		self.token_expires_in
	}

	pub fn refresh_token_expires_in(&self) -> u64 {
		self.refresh_token_expires_in
	}

	pub fn code_expires_in(&self) -> u64 {
		self.code_expires_in
	}

	pub fn device_code_expires_in(&self) -> u64 {
		self.device_code_expires_in
	}

	/// Checks that the client may use the `requested` grant type.
	pub fn validate_grant_type(&self, requested: &GrantType) -> OAuthResult<()> {
		let grant_types = self.grant_types.as_ref().ok_or_else(|| {
			OAuthError::server_error(format!(
				"client `{}` has no registered grant types",
				self.client_id.as_str()
			))
		})?;

		if grant_types.contains(requested) {
			Ok(())
		} else {
			Err(OAuthError::with_description(
				ErrorKind::UnsupportedGrantType,
				format!("grant type `{requested}` is not allowed for this client"),
			))
		}
	}

	/// Computes the scopes granted for the `requested` scope string.
	///
	/// The requested string is split on whitespace and deduplicated. With
	/// `match_all_scopes`, every requested scope must be registered and the
	/// whole request is granted; otherwise the registered subset of the
	/// request is granted, in request order, and must not be empty.
	pub fn validate_scopes(&self, requested: Option<&str>) -> OAuthResult<Vec<ScopeTokenBuf>> {
		let requested = parse_scope_tokens(requested.unwrap_or_default()).map_err(|token| {
			OAuthError::invalid_scope(format!("malformed scope `{token}`"))
				.with_more_info(json!({ "scope": token }))
		})?;

		if requested.is_empty() {
			return if self.scopes_required {
				Err(OAuthError::invalid_scope("a scope is required"))
			} else {
				Ok(requested)
			};
		}

		if self.scopes.is_empty() {
			return Err(OAuthError::invalid_scope(
				"the client has no registered scopes",
			));
		}

		if self.match_all_scopes {
			if let Some(missing) = requested.iter().find(|s| !self.scopes.contains(*s)) {
				return Err(OAuthError::invalid_scope(format!(
					"scope `{}` is not allowed for this client",
					missing.as_str()
				))
				.with_more_info(json!({ "scope": missing.as_str() })));
			}

			Ok(requested)
		} else {
			let granted: Vec<_> = requested
				.into_iter()
				.filter(|s| self.scopes.contains(s))
				.collect();

			if granted.is_empty() {
				Err(OAuthError::invalid_scope(
					"none of the requested scopes is allowed for this client",
				))
			} else {
				Ok(granted)
			}
		}
	}

	/// Checks the `requested` redirect URI against the registered ones.
	///
	/// The comparison is byte-for-byte: no normalization, no prefix or
	/// suffix matching. Skipped entirely when the policy does not require a
	/// redirect URI.
	pub fn validate_redirect_uri(&self, requested: Option<&str>) -> OAuthResult<()> {
		if !self.redirect_uri_required {
			return Ok(());
		}

		let requested = requested
			.filter(|uri| !uri.is_empty())
			.ok_or_else(|| OAuthError::invalid_request("missing `redirect_uri`"))?;

		if self.redirect_uris.iter().any(|uri| uri == requested) {
			Ok(())
		} else {
			Err(OAuthError::invalid_request("`redirect_uri` is not registered")
				.with_more_info(json!({ "redirect_uri": requested })))
		}
	}

	/// Compares the `provided` state with the `expected` one.
	///
	/// Skipped when the policy does not require a state.
	pub fn validate_state(&self, provided: Option<&State>, expected: Option<&State>) -> OAuthResult<()> {
		if !self.state_required {
			return Ok(());
		}

		match (provided, expected) {
			(Some(provided), Some(expected)) if provided.matches(expected) => Ok(()),
			(None, _) => Err(OAuthError::invalid_request("missing `state`")),
			_ => Err(OAuthError::invalid_request("`state` mismatch")),
		}
	}

	/// Checks that the `received` response type is the `expected` one.
	pub fn validate_response_type(received: Option<&str>, expected: &str) -> OAuthResult<()> {
		let received = received
			.filter(|r| !r.is_empty())
			.ok_or_else(|| OAuthError::invalid_request("missing `response_type`"))?;

		if received == expected {
			Ok(())
		} else {
			Err(OAuthError::with_description(
				ErrorKind::UnsupportedResponseType,
				format!("response type `{received}` is not supported"),
			))
		}
	}
}

impl fmt::Debug for ClientPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientPolicy")
			.field("client_id", &self.client_id.as_str())
			.field("grant_types", &self.grant_types)
			.field("scopes", &self.scopes)
			.field("redirect_uris", &self.redirect_uris)
			.finish_non_exhaustive()
	}
}

/// Returns the instant `seconds` from now.
pub(crate) fn expires_at(seconds: u64) -> OAuthResult<DateTime<Utc>> {
	i64::try_from(seconds)
		.ok()
		.and_then(TimeDelta::try_seconds)
		.and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
		.ok_or_else(|| OAuthError::server_error(format!("lifetime of {seconds}s overflows")))
}

/// Source of registered client policies.
pub trait ClientRegistry {
	/// Returns the policy of `client_id`, or fails with
	/// [`ErrorKind::InvalidClient`] if the client is unknown.
	#[allow(async_fn_in_trait)]
	async fn lookup_client(&self, client_id: &ClientId) -> OAuthResult<ClientPolicy>;
}

impl ClientRegistry for BTreeMap<String, ClientPolicy> {
	async fn lookup_client(&self, client_id: &ClientId) -> OAuthResult<ClientPolicy> {
		self.get(client_id.as_str()).cloned().ok_or_else(|| {
			OAuthError::with_description(
				ErrorKind::InvalidClient,
				format!("unknown client `{}`", client_id.as_str()),
			)
		})
	}
}

/// Resolves the policy of the client named by an untrusted `client_id`
/// parameter.
pub async fn lookup_client(
	registry: &impl ClientRegistry,
	client_id: Option<&str>,
) -> OAuthResult<ClientPolicy> {
	let client_id = client_id
		.filter(|id| !id.is_empty())
		.and_then(|id| ClientId::new(id).ok())
		.ok_or_else(|| OAuthError::with_description(ErrorKind::InvalidClient, "missing or malformed `client_id`"))?;

	registry.lookup_client(client_id).await
}
