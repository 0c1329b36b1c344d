use std::collections::BTreeSet;

use iref::UriBuf;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
	GrantType, ScopeTokenBuf, endpoints::authorization::RESPONSE_TYPE_CODE,
	ext::pkce::PkceCodeChallengeMethod, policy::ClientPolicy, util::NoExtension,
};

/// Authorization Server Metadata.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc8414>
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthorizationServerMetadata<P = NoExtension> {
	pub issuer: UriBuf,

	pub authorization_endpoint: Option<UriBuf>,

	pub token_endpoint: Option<UriBuf>,

	/// See: <https://datatracker.ietf.org/doc/html/rfc8628#section-4>
	pub device_authorization_endpoint: Option<UriBuf>,

	pub jwks_uri: Option<UriBuf>,

	pub scopes_supported: Option<Vec<ScopeTokenBuf>>,

	/// Required by RFC 8414, but made optional by some extensions.
	pub response_types_supported: Option<Vec<String>>,

	#[serde(default = "default_response_modes_supported")]
	pub response_modes_supported: Vec<String>,

	#[serde(default = "default_grant_types_supported")]
	pub grant_types_supported: Vec<GrantType>,

	pub revocation_endpoint: Option<UriBuf>,

	pub introspection_endpoint: Option<UriBuf>,

	pub code_challenge_methods_supported: Option<Vec<PkceCodeChallengeMethod>>,

	#[serde(flatten)]
	pub extra: P,
}

impl<P> AuthorizationServerMetadata<P> {
	/// Metadata of an issuer serving the authorization code grant through
	/// the `query` response mode.
	pub fn new(issuer: UriBuf) -> Self
	where
		P: Default,
	{
		Self {
			issuer,
			authorization_endpoint: None,
			token_endpoint: None,
			device_authorization_endpoint: None,
			jwks_uri: None,
			scopes_supported: None,
			response_types_supported: None,
			response_modes_supported: served_response_modes(),
			grant_types_supported: vec![GrantType::AuthorizationCode],
			revocation_endpoint: None,
			introspection_endpoint: None,
			code_challenge_methods_supported: None,
			extra: Default::default(),
		}
	}

	pub fn with_authorization_endpoint(self, authorization_endpoint: UriBuf) -> Self {
		Self {
			authorization_endpoint: Some(authorization_endpoint),
			..self
		}
	}

	pub fn with_token_endpoint(self, token_endpoint: UriBuf) -> Self {
		Self {
			token_endpoint: Some(token_endpoint),
			..self
		}
	}

	pub fn with_device_authorization_endpoint(self, device_authorization_endpoint: UriBuf) -> Self {
		Self {
			device_authorization_endpoint: Some(device_authorization_endpoint),
			..self
		}
	}

	/// Advertises what the registered clients may use: the union of their
	/// grant types and scopes, and the PKCE methods they accept.
	///
	/// `plain` is only listed when at least one client allows it.
	pub fn advertise<'a>(self, policies: impl IntoIterator<Item = &'a ClientPolicy>) -> Self {
		let mut grant_types = BTreeSet::new();
		let mut scopes = BTreeSet::new();
		let mut plain = false;

		for policy in policies {
			if let Some(allowed) = policy.grant_types() {
				grant_types.extend(allowed.iter().cloned());
			}

			scopes.extend(policy.scopes().iter().cloned());
			plain |= policy.allows_plain_pkce();
		}

		let code = grant_types.contains(&GrantType::AuthorizationCode);
		let methods = if plain {
			vec![PkceCodeChallengeMethod::S256, PkceCodeChallengeMethod::Plain]
		} else {
			vec![PkceCodeChallengeMethod::S256]
		};

		Self {
			scopes_supported: (!scopes.is_empty()).then(|| scopes.into_iter().collect()),
			response_types_supported: code.then(|| vec![RESPONSE_TYPE_CODE.to_owned()]),
			response_modes_supported: served_response_modes(),
			grant_types_supported: grant_types.into_iter().collect(),
			code_challenge_methods_supported: code.then_some(methods),
			..self
		}
	}
}

/// Response modes assumed when the metadata omits them.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc8414#section-2>
pub fn default_response_modes_supported() -> Vec<String> {
	vec!["query".to_owned(), "fragment".to_owned()]
}

/// Codes are only ever returned in the redirect URI query.
fn served_response_modes() -> Vec<String> {
	vec!["query".to_owned()]
}

/// Grant types assumed when the metadata omits them.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc8414#section-2>
pub fn default_grant_types_supported() -> Vec<GrantType> {
	vec![GrantType::AuthorizationCode, GrantType::from("implicit")]
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::policy::ClientRegistration;

	use super::*;

	fn uri(value: &str) -> UriBuf {
		UriBuf::new(value.as_bytes().to_vec()).unwrap()
	}

	#[test]
	fn advertise_registered_clients() {
		let web = ClientPolicy::new(
			ClientRegistration::new("web")
				.with_grant_types("authorization_code refresh_token")
				.with_scopes("read write"),
		)
		.unwrap();
		let tv = ClientPolicy::new(
			ClientRegistration::new("tv")
				.with_grant_types("device_code")
				.with_scopes("read"),
		)
		.unwrap();

		let metadata = AuthorizationServerMetadata::<NoExtension>::new(uri("https://auth.example"))
			.with_token_endpoint(uri("https://auth.example/token"))
			.with_device_authorization_endpoint(uri("https://auth.example/device"))
			.advertise([&web, &tv]);

		assert_eq!(
			serde_json::to_value(&metadata).unwrap(),
			json!({
				"issuer": "https://auth.example",
				"token_endpoint": "https://auth.example/token",
				"device_authorization_endpoint": "https://auth.example/device",
				"scopes_supported": ["read", "write"],
				"response_types_supported": ["code"],
				"response_modes_supported": ["query"],
				"grant_types_supported": ["authorization_code", "refresh_token", "device_code"],
				"code_challenge_methods_supported": ["S256"]
			})
		);
	}

	#[test]
	fn new_advertises_served_features_only() {
		let metadata: AuthorizationServerMetadata =
			AuthorizationServerMetadata::new(uri("https://auth.example"));

		assert_eq!(
			serde_json::to_value(&metadata).unwrap(),
			json!({
				"issuer": "https://auth.example",
				"response_modes_supported": ["query"],
				"grant_types_supported": ["authorization_code"]
			})
		);
	}

	#[test]
	fn defaults_when_omitted() {
		let metadata: AuthorizationServerMetadata =
			serde_json::from_value(json!({ "issuer": "https://auth.example" })).unwrap();

		assert_eq!(metadata.grant_types_supported, default_grant_types_supported());
		assert_eq!(metadata.response_modes_supported, ["query", "fragment"]);
	}
}
