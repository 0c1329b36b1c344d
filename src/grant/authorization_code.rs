//! Authorization Code Grant, with Proof Key for Code Exchange.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1>
use chrono::Utc;

use crate::{
	Code, GrantType,
	endpoints::{
		authorization::{AuthorizationRequest, AuthorizationResponse, RESPONSE_TYPE_CODE},
		token::TokenRequest,
	},
	error::{OAuthError, OAuthResult},
	ext::pkce::{
		PkceCodeChallenge, PkceCodeChallengeAndMethod, PkceCodeChallengeBuf,
		PkceCodeChallengeMethod,
	},
	policy::{ClientPolicy, expires_at},
};

use super::{
	AuthorizationCodeHooks, CodeIssuance, CodeValidation, TokenGrant, check_bound_client,
	check_client_id, check_grant_type, required,
};

/// Authorization code flow of a single client.
pub struct AuthorizationCodeFlow<'a, H> {
	policy: &'a ClientPolicy,
	hooks: &'a H,
}

impl<'a, H> AuthorizationCodeFlow<'a, H> {
	pub fn new(policy: &'a ClientPolicy, hooks: &'a H) -> Self {
		Self { policy, hooks }
	}

	pub fn policy(&self) -> &'a ClientPolicy {
		self.policy
	}

	/// Reads the PKCE challenge of an authorization request.
	///
	/// A challenge sent without method uses `plain`, which is refused unless
	/// the client allows it.
	fn bind_pkce(
		&self,
		request: &AuthorizationRequest,
	) -> OAuthResult<Option<PkceCodeChallengeAndMethod>> {
		let challenge = request.code_challenge.as_deref().filter(|c| !c.is_empty());
		let method = request
			.code_challenge_method
			.as_deref()
			.filter(|m| !m.is_empty());

		let Some(challenge) = challenge else {
			if method.is_some() {
				return Err(OAuthError::invalid_request(
					"`code_challenge_method` sent without `code_challenge`",
				));
			}

			if self.policy.pkce_required() {
				return Err(OAuthError::invalid_request("missing `code_challenge`"));
			}

			return Ok(None);
		};

		let method = match method {
			Some(method) => method.parse().map_err(|_| {
				OAuthError::invalid_request(format!(
					"unsupported `code_challenge_method` `{method}`"
				))
			})?,
			None => PkceCodeChallengeMethod::Plain,
		};

		if method == PkceCodeChallengeMethod::Plain {
			if !self.policy.allows_plain_pkce() {
				return Err(OAuthError::invalid_request(
					"the `plain` code challenge method is not allowed",
				));
			}

			log::warn!(
				"client `{}` bound an authorization code to a `plain` PKCE challenge",
				self.policy.client_id().as_str()
			);
		}

		let challenge = PkceCodeChallengeBuf::new(challenge.to_owned())
			.map_err(|_| OAuthError::invalid_request("malformed `code_challenge`"))?;

		Ok(Some(PkceCodeChallengeAndMethod { challenge, method }))
	}

	/// Checks a code verifier against the challenge stored with a code.
	///
	/// The stored challenge was validated at issuance, so a malformed one
	/// is a server fault.
	fn verify_pkce<I>(
		&self,
		validation: &CodeValidation<I>,
		code_verifier: Option<&str>,
	) -> OAuthResult<()> {
		let code_verifier = code_verifier.filter(|v| !v.is_empty());

		let Some(challenge) = validation.code_challenge.as_deref() else {
			if self.policy.pkce_required() {
				return Err(OAuthError::invalid_grant(
					"authorization code is not bound to a PKCE challenge",
				));
			}

			if code_verifier.is_some() {
				return Err(OAuthError::invalid_grant(
					"`code_verifier` sent for a code issued without PKCE challenge",
				));
			}

			return Ok(());
		};

		let code_verifier = code_verifier
			.ok_or_else(|| OAuthError::invalid_request("missing `code_verifier`"))?;

		let method = match validation.code_challenge_method.as_deref() {
			Some(method) => method.parse().map_err(|_| {
				OAuthError::server_error(format!(
					"authorization code is bound to unknown PKCE method `{method}`"
				))
			})?,
			None => PkceCodeChallengeMethod::Plain,
		};

		if method == PkceCodeChallengeMethod::Plain && !self.policy.allows_plain_pkce() {
			return Err(OAuthError::server_error(
				"authorization code is bound to a `plain` PKCE challenge",
			));
		}

		let challenge = PkceCodeChallenge::new(challenge).map_err(|_| {
			OAuthError::server_error("authorization code is bound to a malformed PKCE challenge")
		})?;

		if method.verify(code_verifier, challenge) {
			Ok(())
		} else {
			Err(OAuthError::invalid_grant("PKCE verification failed"))
		}
	}
}

impl<'a, H> AuthorizationCodeFlow<'a, H>
where
	H: AuthorizationCodeHooks,
{
	/// Validates an authorization request and issues a code.
	///
	/// `code_info` is attached to the code, and handed back to
	/// [`TokenHooks::generate_token`](super::TokenHooks::generate_token) when
	/// the code is redeemed.
	pub async fn get_code(
		&self,
		request: &AuthorizationRequest,
		code_info: H::Info,
	) -> OAuthResult<AuthorizationResponse> {
		check_client_id(self.policy, request.client_id.as_deref())?;
		ClientPolicy::validate_response_type(request.response_type.as_deref(), RESPONSE_TYPE_CODE)?;
		self.policy
			.validate_redirect_uri(request.redirect_uri.as_deref())?;

		if self.policy.state_required() && request.state.is_none() {
			return Err(OAuthError::invalid_request("missing `state`"));
		}

		let scopes = self.policy.validate_scopes(request.scope.as_deref())?;
		let pkce = self.bind_pkce(request)?;

		let code = self
			.hooks
			.generate_code(CodeIssuance {
				client: self.policy,
				scopes,
				redirect_uri: request.redirect_uri.clone(),
				pkce,
				code_info,
				expires_at: expires_at(self.policy.code_expires_in())?,
			})
			.await?;

		log::debug!(
			"issued authorization code to client `{}`",
			self.policy.client_id().as_str()
		);

		// Only registered URIs are redirect targets, even when the policy
		// does not require a redirect URI. Otherwise fall back to the only
		// registered one.
		let registered = self.policy.redirect_uris();
		let redirect_uri = match request.redirect_uri.as_deref() {
			Some(uri) if registered.iter().any(|r| r == uri) => Some(uri.to_owned()),
			requested => {
				if let Some(uri) = requested {
					log::warn!(
						"not redirecting client `{}` to unregistered `{uri}`",
						self.policy.client_id().as_str()
					);
				}

				match registered {
					[only] => Some(only.clone()),
					_ => None,
				}
			}
		};

		Ok(AuthorizationResponse {
			code,
			state: request.state.clone(),
			redirect_uri,
		})
	}

	/// Redeems an authorization code for a token.
	pub async fn get_token(&self, request: &TokenRequest) -> OAuthResult<H::Token> {
		check_grant_type(self.policy, request, &GrantType::AuthorizationCode)?;

		let code = required(request.code.as_deref(), "code")?;
		let code = Code::new(code).map_err(|_| OAuthError::invalid_request("malformed `code`"))?;

		let validation = self.hooks.validate_code(code).await?;
		check_bound_client(self.policy, &validation.client_id, "authorization code")?;

		if validation.expires_at <= Utc::now() {
			return Err(OAuthError::invalid_grant("authorization code expired"));
		}

		if validation.redirect_uri.as_deref() != request.redirect_uri.as_deref() {
			return Err(OAuthError::invalid_grant(
				"`redirect_uri` does not match the authorization request",
			));
		}

		self.verify_pkce(&validation, request.code_verifier.as_deref())?;

		let grant = TokenGrant::new(
			self.policy,
			GrantType::AuthorizationCode,
			validation.scopes,
			Some(validation.code_info),
			self.policy.issues_refresh_token(),
		)?;

		log::debug!(
			"redeemed authorization code of client `{}`",
			self.policy.client_id().as_str()
		);

		self.hooks.generate_token(grant).await
	}
}
