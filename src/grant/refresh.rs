//! Refreshing an Access Token.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-6>
use chrono::Utc;
use serde_json::json;

use crate::{
	GrantType, RefreshToken, ScopeTokenBuf,
	endpoints::token::TokenRequest,
	error::{OAuthError, OAuthResult},
	parse_scope_tokens,
	policy::ClientPolicy,
};

use super::{
	RefreshTokenHooks, RefreshTokenIssuance, TokenGrant, check_bound_client, check_grant_type,
	required,
};

pub struct RefreshTokenFlow<'a, H> {
	policy: &'a ClientPolicy,
	hooks: &'a H,
}

impl<'a, H> RefreshTokenFlow<'a, H> {
	pub fn new(policy: &'a ClientPolicy, hooks: &'a H) -> Self {
		Self { policy, hooks }
	}
}

impl<'a, H> RefreshTokenFlow<'a, H>
where
	H: RefreshTokenHooks,
{
	/// Exchanges a refresh token for a new access token.
	///
	/// The requested scope may narrow the original grant, never widen it.
	/// A new refresh token is only issued when the client policy allows it
	/// and [`RefreshTokenHooks::issue_new_refresh_token`] rotates the
	/// presented one.
	pub async fn get_token(&self, request: &TokenRequest) -> OAuthResult<H::Token> {
		check_grant_type(self.policy, request, &GrantType::RefreshToken)?;

		let token = required(request.refresh_token.as_deref(), "refresh_token")?;
		let token = RefreshToken::new(token)
			.map_err(|_| OAuthError::invalid_request("malformed `refresh_token`"))?;

		let prior = self.hooks.validate_refresh_token(token).await?;
		check_bound_client(self.policy, &prior.client_id, "refresh token")?;

		if prior.expires_at.is_some_and(|t| t <= Utc::now()) {
			return Err(OAuthError::invalid_grant("refresh token expired"));
		}

		let scopes = narrow_scopes(&prior.scopes, request.scope.as_deref())?;

		let rotated = if self.policy.issues_refresh_token() {
			self.hooks.issue_new_refresh_token(&prior).await?
		} else {
			None
		};

		let rotating = rotated.is_some();
		let mut grant = TokenGrant::new(self.policy, GrantType::RefreshToken, scopes, prior.info, false)?;

		if let Some(new_token) = rotated {
			grant.refresh_token = Some(RefreshTokenIssuance::new(
				self.policy.refresh_token_expires_in(),
				Some(new_token),
			)?);
		}

		let issued = self.hooks.generate_token(grant).await?;

		if rotating {
			// The new tokens are already minted: a failed revocation must not
			// withhold them from the client.
			match self.hooks.revoke_refresh_token(token).await {
				Ok(()) => log::debug!(
					"rotated refresh token of client `{}`",
					self.policy.client_id().as_str()
				),
				Err(e) => log::warn!(
					"could not revoke rotated refresh token of client `{}`: {e}",
					self.policy.client_id().as_str()
				),
			}
		}

		Ok(issued)
	}
}

/// Restricts the scopes of a refreshed grant to the requested ones.
///
/// An absent or blank request keeps the original scopes.
fn narrow_scopes(
	granted: &[ScopeTokenBuf],
	requested: Option<&str>,
) -> OAuthResult<Vec<ScopeTokenBuf>> {
	let requested = parse_scope_tokens(requested.unwrap_or_default()).map_err(|token| {
		OAuthError::invalid_scope(format!("malformed scope token `{token}`"))
			.with_more_info(json!({ "scope": token }))
	})?;

	if requested.is_empty() {
		return Ok(granted.to_vec());
	}

	if let Some(extra) = requested.iter().find(|s| !granted.contains(*s)) {
		return Err(
			OAuthError::invalid_scope(format!("scope `{}` exceeds the original grant", extra.as_str()))
				.with_more_info(json!({ "scope": extra.as_str() })),
		);
	}

	Ok(requested)
}
