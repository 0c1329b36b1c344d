//! OAuth 2.0 grant flows.
//!
//! Each submodule validates the requests of one grant type against a
//! [`ClientPolicy`] and delegates minting and storage to its hooks:
//!
//! - [`authorization_code`]: Authorization Code Grant with PKCE
//!   ([RFC 6749 Section 4.1](https://datatracker.ietf.org/doc/html/rfc6749#section-4.1),
//!   [RFC 7636](https://datatracker.ietf.org/doc/html/rfc7636)).
//! - [`client_credentials`]: Client Credentials Grant
//!   ([RFC 6749 Section 4.4](https://datatracker.ietf.org/doc/html/rfc6749#section-4.4)).
//! - [`password`]: Resource Owner Password Credentials Grant
//!   ([RFC 6749 Section 4.3](https://datatracker.ietf.org/doc/html/rfc6749#section-4.3)).
//! - [`refresh`]: Refreshing an Access Token
//!   ([RFC 6749 Section 6](https://datatracker.ietf.org/doc/html/rfc6749#section-6)).
//! - [`device_code`]: Device Authorization Grant
//!   ([RFC 8628](https://datatracker.ietf.org/doc/html/rfc8628)).
//!
//! [`Flow`] selects the flow matching the `grant_type` of a token request.
use crate::{
	ClientId, GrantType,
	endpoints::token::TokenRequest,
	error::{ErrorKind, OAuthError, OAuthResult},
	policy::ClientPolicy,
};

pub mod authorization_code;
pub mod client_credentials;
pub mod device_code;
pub mod hooks;
pub mod password;
pub mod refresh;

#[cfg(test)]
pub(crate) mod memory;

pub use authorization_code::AuthorizationCodeFlow;
pub use client_credentials::ClientCredentialsFlow;
pub use device_code::{DeviceCodeConfig, DeviceCodeFlow, DeviceCodeStatus};
pub use hooks::*;
pub use password::PasswordFlow;
pub use refresh::RefreshTokenFlow;

/// Checks the `grant_type` of a token request against the grant handled by
/// a flow, then against the client's allowed grant types.
///
/// A `client_id` sent in the request must name the client of `policy`.
fn check_grant_type(
	policy: &ClientPolicy,
	request: &TokenRequest,
	expected: &GrantType,
) -> OAuthResult<()> {
	let requested = required(request.grant_type.as_deref(), "grant_type")?;

	if requested != expected.as_str() {
		return Err(OAuthError::with_description(
			ErrorKind::UnsupportedGrantType,
			format!("expected grant type `{expected}`, found `{requested}`"),
		));
	}

	check_client_id(policy, request.client_id.as_deref())?;
	policy.validate_grant_type(expected)
}

/// Fails with `invalid_client` if a request names another client than the
/// one of `policy`.
fn check_client_id(policy: &ClientPolicy, client_id: Option<&str>) -> OAuthResult<()> {
	if client_id.is_some_and(|client_id| client_id != policy.client_id().as_str()) {
		return Err(OAuthError::with_description(
			ErrorKind::InvalidClient,
			"`client_id` does not match the client",
		));
	}

	Ok(())
}

/// Fails with `invalid_grant` unless a stored grant belongs to the client of
/// `policy`.
fn check_bound_client(policy: &ClientPolicy, bound: &ClientId, what: &str) -> OAuthResult<()> {
	if bound.as_str() == policy.client_id().as_str() {
		Ok(())
	} else {
		Err(OAuthError::invalid_grant(format!(
			"{what} was issued to another client"
		)))
	}
}

/// Returns a non-empty request parameter, or fails with `invalid_request`.
fn required<'a>(value: Option<&'a str>, name: &str) -> OAuthResult<&'a str> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| OAuthError::invalid_request(format!("missing `{name}`")))
}

/// Token endpoint flow, selected from the `grant_type` of a request.
pub enum Flow<'a, H> {
	AuthorizationCode(AuthorizationCodeFlow<'a, H>),
	ClientCredentials(ClientCredentialsFlow<'a, H>),
	Password(PasswordFlow<'a, H>),
	RefreshToken(RefreshTokenFlow<'a, H>),
	DeviceCode(DeviceCodeFlow<'a, H>),
}

impl<'a, H> Flow<'a, H> {
	/// Grant type handled by this flow.
	pub fn grant_type(&self) -> GrantType {
		match self {
			Self::AuthorizationCode(_) => GrantType::AuthorizationCode,
			Self::ClientCredentials(_) => GrantType::ClientCredentials,
			Self::Password(_) => GrantType::Password,
			Self::RefreshToken(_) => GrantType::RefreshToken,
			Self::DeviceCode(flow) => flow.grant_type().clone(),
		}
	}
}

impl<'a, H> Flow<'a, H>
where
	H: AuthorizationCodeHooks + PasswordHooks + RefreshTokenHooks + DeviceCodeHooks,
{
	/// Selects the flow handling `grant_type`.
	///
	/// The device flow is only available when a `device` configuration is
	/// given, under its configured grant type name.
	pub fn for_grant_type(
		grant_type: Option<&str>,
		policy: &'a ClientPolicy,
		hooks: &'a H,
		device: Option<&DeviceCodeConfig>,
	) -> OAuthResult<Self> {
		let grant_type = required(grant_type, "grant_type")?;

		if let Some(config) = device.filter(|config| config.grant_type.as_str() == grant_type) {
			return DeviceCodeFlow::new(policy, hooks, config).map(Self::DeviceCode);
		}

		match GrantType::from(grant_type) {
			GrantType::AuthorizationCode => Ok(Self::AuthorizationCode(
				AuthorizationCodeFlow::new(policy, hooks),
			)),
			GrantType::ClientCredentials => Ok(Self::ClientCredentials(
				ClientCredentialsFlow::new(policy, hooks),
			)),
			GrantType::Password => Ok(Self::Password(PasswordFlow::new(policy, hooks))),
			GrantType::RefreshToken => Ok(Self::RefreshToken(RefreshTokenFlow::new(policy, hooks))),
			other => Err(OAuthError::with_description(
				ErrorKind::UnsupportedGrantType,
				format!("unsupported grant type `{other}`"),
			)),
		}
	}

	/// Handles a token request with the flow selected by its `grant_type`.
	pub async fn dispatch(
		request: &TokenRequest,
		policy: &'a ClientPolicy,
		hooks: &'a H,
		device: Option<&DeviceCodeConfig>,
	) -> OAuthResult<H::Token> {
		Self::for_grant_type(request.grant_type.as_deref(), policy, hooks, device)?
			.get_token(request)
			.await
	}

	pub async fn get_token(&self, request: &TokenRequest) -> OAuthResult<H::Token> {
		match self {
			Self::AuthorizationCode(flow) => flow.get_token(request).await,
			Self::ClientCredentials(flow) => flow.get_token(request).await,
			Self::Password(flow) => flow.get_token(request).await,
			Self::RefreshToken(flow) => flow.get_token(request).await,
			Self::DeviceCode(flow) => flow.get_token(request).await,
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::policy::ClientRegistration;

	use super::{memory::MemoryHooks, *};

	fn policy() -> ClientPolicy {
		ClientPolicy::new(
			ClientRegistration::new("c1")
				.with_grant_types("client_credentials password refresh_token device_code")
				.with_scopes("read write"),
		)
		.unwrap()
	}

	#[test]
	fn selects_flow_by_grant_type() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		for name in ["authorization_code", "client_credentials", "password", "refresh_token"] {
			let flow = Flow::for_grant_type(Some(name), &policy, &hooks, None).unwrap();
			assert_eq!(flow.grant_type().as_str(), name);
		}
	}

	#[test]
	fn unknown_grant_type() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let error = Flow::for_grant_type(Some("implicit"), &policy, &hooks, None)
			.err()
			.unwrap();
		assert_eq!(error.kind(), ErrorKind::UnsupportedGrantType);

		let error = Flow::for_grant_type(None, &policy, &hooks, None).err().unwrap();
		assert_eq!(error.kind(), ErrorKind::InvalidRequest);
	}

	#[test]
	fn device_flow_needs_configuration() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let error = Flow::for_grant_type(Some("device_code"), &policy, &hooks, None)
			.err()
			.unwrap();
		assert_eq!(error.kind(), ErrorKind::UnsupportedGrantType);

		let config = DeviceCodeConfig::new("https://a/device", "https://a/device?user_code=");
		let flow = Flow::for_grant_type(Some("device_code"), &policy, &hooks, Some(&config)).unwrap();
		assert!(matches!(flow, Flow::DeviceCode(_)));
	}

	#[tokio::test]
	async fn dispatch_client_credentials() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let mut request = TokenRequest::new("client_credentials");
		request.scope = Some("read".to_owned());

		let response = Flow::dispatch(&request, &policy, &hooks, None).await.unwrap();
		assert_eq!(response.scope.unwrap().as_str(), "read");
		assert_eq!(response.refresh_token, None);
	}

	#[tokio::test]
	async fn request_client_must_match_policy() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let mut request = TokenRequest::new("client_credentials");
		request.client_id = Some("c2".to_owned());

		let error = Flow::dispatch(&request, &policy, &hooks, None).await.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::InvalidClient);
	}
}
