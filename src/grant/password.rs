//! Resource Owner Password Credentials Grant.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.3>
use crate::{GrantType, endpoints::token::TokenRequest, error::OAuthResult, policy::ClientPolicy};

use super::{PasswordHooks, TokenGrant, check_grant_type, required};

pub struct PasswordFlow<'a, H> {
	policy: &'a ClientPolicy,
	hooks: &'a H,
}

impl<'a, H> PasswordFlow<'a, H> {
	pub fn new(policy: &'a ClientPolicy, hooks: &'a H) -> Self {
		Self { policy, hooks }
	}
}

impl<'a, H> PasswordFlow<'a, H>
where
	H: PasswordHooks,
{
	/// Authenticates the resource owner through
	/// [`PasswordHooks::verify_resource_owner`] and issues a token.
	pub async fn get_token(&self, request: &TokenRequest) -> OAuthResult<H::Token> {
		check_grant_type(self.policy, request, &GrantType::Password)?;

		let username = required(request.username.as_deref(), "username")?;
		let password = required(request.password.as_deref(), "password")?;
		let scopes = self.policy.validate_scopes(request.scope.as_deref())?;

		let owner = self
			.hooks
			.verify_resource_owner(self.policy, username, password)
			.await?;

		let grant = TokenGrant::new(
			self.policy,
			GrantType::Password,
			scopes,
			Some(owner),
			self.policy.issues_refresh_token(),
		)?;

		self.hooks.generate_token(grant).await
	}
}

#[cfg(test)]
mod tests {
	use crate::{error::ErrorKind, grant::memory::MemoryHooks, policy::ClientRegistration};

	use super::*;

	fn policy() -> ClientPolicy {
		ClientPolicy::new(
			ClientRegistration::new("app")
				.with_grant_types("password")
				.with_scopes("read"),
		)
		.unwrap()
	}

	fn request(username: Option<&str>, password: Option<&str>) -> TokenRequest {
		TokenRequest {
			username: username.map(ToOwned::to_owned),
			password: password.map(ToOwned::to_owned),
			..TokenRequest::new("password")
		}
	}

	#[tokio::test]
	async fn valid_credentials() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let token = PasswordFlow::new(&policy, &hooks)
			.get_token(&request(Some("alice"), Some("secret")))
			.await
			.unwrap();

		assert!(token.refresh_token.is_some());
		assert_eq!(hooks.last_info().as_deref(), Some("alice"));
	}

	#[tokio::test]
	async fn bad_credentials() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let error = PasswordFlow::new(&policy, &hooks)
			.get_token(&request(Some("alice"), Some("guess")))
			.await
			.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::InvalidGrant);
	}

	#[tokio::test]
	async fn missing_credentials() {
		let policy = policy();
		let hooks = MemoryHooks::default();
		let flow = PasswordFlow::new(&policy, &hooks);

		for request in [
			request(None, Some("secret")),
			request(Some("alice"), None),
			request(Some(""), Some("secret")),
		] {
			let error = flow.get_token(&request).await.unwrap_err();
			assert_eq!(error.kind(), ErrorKind::InvalidRequest);
		}
	}

	#[tokio::test]
	async fn no_refresh_token_when_disabled() {
		let policy = ClientPolicy::new(ClientRegistration {
			issues_refresh_token: false,
			..ClientRegistration::new("app").with_grant_types("password")
		})
		.unwrap();
		let hooks = MemoryHooks::default();

		let token = PasswordFlow::new(&policy, &hooks)
			.get_token(&request(Some("alice"), Some("secret")))
			.await
			.unwrap();
		assert_eq!(token.refresh_token, None);
	}
}
