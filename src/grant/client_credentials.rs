//! Client Credentials Grant.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.4>
use crate::{GrantType, endpoints::token::TokenRequest, error::OAuthResult, policy::ClientPolicy};

use super::{TokenGrant, TokenHooks, check_grant_type};

/// Client credentials flow of a single, already authenticated, client.
///
/// No refresh token is ever issued by this flow.
pub struct ClientCredentialsFlow<'a, H> {
	policy: &'a ClientPolicy,
	hooks: &'a H,
}

impl<'a, H> ClientCredentialsFlow<'a, H> {
	pub fn new(policy: &'a ClientPolicy, hooks: &'a H) -> Self {
		Self { policy, hooks }
	}
}

impl<'a, H> ClientCredentialsFlow<'a, H>
where
	H: TokenHooks,
{
	pub async fn get_token(&self, request: &TokenRequest) -> OAuthResult<H::Token> {
		check_grant_type(self.policy, request, &GrantType::ClientCredentials)?;
		let scopes = self.policy.validate_scopes(request.scope.as_deref())?;

		let grant = TokenGrant::new(self.policy, GrantType::ClientCredentials, scopes, None, false)?;
		log::debug!(
			"issuing client credentials token to `{}`",
			self.policy.client_id().as_str()
		);

		self.hooks.generate_token(grant).await
	}
}
