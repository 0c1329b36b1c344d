//! In-memory hooks backing the flow tests.
use std::{
	collections::BTreeMap,
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use crate::{
	AccessTokenBuf, Code, CodeBuf, DeviceCode, DeviceCodeBuf, IntoScope, RefreshToken,
	RefreshTokenBuf,
	endpoints::token::TokenResponse,
	error::{OAuthError, OAuthResult},
	policy::ClientPolicy,
};

use super::{
	AuthorizationCodeHooks, CodeIssuance, CodeValidation, DeviceCodeHooks, DeviceCodeIssuance,
	DeviceCodeStatus, DeviceCodeValidation, PasswordHooks, RefreshGrant, RefreshTokenHooks,
	TokenGrant, TokenHooks,
};

/// Stores codes, refresh tokens and device sessions in maps. Codes and
/// approved device sessions are removed when validated.
#[derive(Default)]
pub(crate) struct MemoryHooks {
	counter: AtomicU64,
	codes: Mutex<BTreeMap<String, CodeValidation<String>>>,
	refresh_tokens: Mutex<BTreeMap<String, RefreshGrant<String>>>,
	devices: Mutex<BTreeMap<String, DeviceCodeValidation<String>>>,
	last_info: Mutex<Option<String>>,
}

impl MemoryHooks {
	fn next_id(&self, prefix: &str) -> String {
		format!("{prefix}-{}", self.counter.fetch_add(1, Ordering::Relaxed))
	}

	/// Info of the last grant a token was minted for.
	pub fn last_info(&self) -> Option<String> {
		self.last_info.lock().unwrap().clone()
	}

	pub fn insert_code(&self, code: &str, validation: CodeValidation<String>) {
		self.codes.lock().unwrap().insert(code.to_owned(), validation);
	}

	pub fn insert_refresh_token(&self, token: &str, grant: RefreshGrant<String>) {
		self.refresh_tokens
			.lock()
			.unwrap()
			.insert(token.to_owned(), grant);
	}

	/// Simulates the user's answer on the verification page.
	pub fn set_device_status(&self, device_code: &str, status: DeviceCodeStatus) {
		if let Some(session) = self.devices.lock().unwrap().get_mut(device_code) {
			session.status = status;
		}
	}
}

impl TokenHooks for MemoryHooks {
	type Info = String;
	type Token = TokenResponse;

	async fn generate_token(&self, grant: TokenGrant<'_, String>) -> OAuthResult<TokenResponse> {
		let access_token = AccessTokenBuf::new(self.next_id("at")).unwrap();
		let mut response = TokenResponse::bearer(access_token)
			.with_expires_in(grant.expires_in)
			.with_scope(grant.scopes.as_slice().into_scope());

		if let Some(issuance) = grant.refresh_token {
			let token = match issuance.token {
				Some(token) => token,
				None => RefreshTokenBuf::new(self.next_id("rt")).unwrap(),
			};

			self.insert_refresh_token(token.as_str(), RefreshGrant {
				client_id: grant.client.client_id().to_owned(),
				scopes: grant.scopes.clone(),
				info: grant.info.clone(),
				expires_at: Some(issuance.expires_at),
			});

			response = response.with_refresh_token(token);
		}

		*self.last_info.lock().unwrap() = grant.info;
		Ok(response)
	}
}

impl AuthorizationCodeHooks for MemoryHooks {
	async fn generate_code(&self, issuance: CodeIssuance<'_, String>) -> OAuthResult<CodeBuf> {
		let code = self.next_id("code");
		self.insert_code(&code, CodeValidation::from_issuance(issuance));
		Ok(CodeBuf::new(code).unwrap())
	}

	async fn validate_code(&self, code: &Code) -> OAuthResult<CodeValidation<String>> {
		self.codes
			.lock()
			.unwrap()
			.remove(code.as_str())
			.ok_or_else(|| OAuthError::invalid_grant("unknown or redeemed authorization code"))
	}
}

impl PasswordHooks for MemoryHooks {
	async fn verify_resource_owner(
		&self,
		_client: &ClientPolicy,
		username: &str,
		password: &str,
	) -> OAuthResult<String> {
		if username == "alice" && password == "secret" {
			Ok(username.to_owned())
		} else {
			Err(OAuthError::invalid_grant("invalid resource owner credentials"))
		}
	}
}

impl RefreshTokenHooks for MemoryHooks {
	async fn validate_refresh_token(&self, token: &RefreshToken) -> OAuthResult<RefreshGrant<String>> {
		self.refresh_tokens
			.lock()
			.unwrap()
			.get(token.as_str())
			.cloned()
			.ok_or_else(|| OAuthError::invalid_grant("unknown refresh token"))
	}

	async fn revoke_refresh_token(&self, token: &RefreshToken) -> OAuthResult<()> {
		self.refresh_tokens.lock().unwrap().remove(token.as_str());
		Ok(())
	}
}

impl DeviceCodeHooks for MemoryHooks {
	async fn generate_device_code(
		&self,
		issuance: DeviceCodeIssuance<'_, String>,
	) -> OAuthResult<DeviceCodeBuf> {
		let device_code = self.next_id("device");
		self.devices.lock().unwrap().insert(
			device_code.clone(),
			DeviceCodeValidation {
				status: DeviceCodeStatus::Pending,
				client_id: issuance.client.client_id().to_owned(),
				scopes: issuance.scopes,
				info: issuance.device_code_info,
			},
		);

		Ok(DeviceCodeBuf::new(device_code).unwrap())
	}

	async fn validate_device_code(
		&self,
		device_code: &DeviceCode,
	) -> OAuthResult<DeviceCodeValidation<String>> {
		let mut devices = self.devices.lock().unwrap();
		let session = devices
			.get(device_code.as_str())
			.cloned()
			.ok_or_else(|| OAuthError::invalid_grant("unknown device code"))?;

		if session.status == DeviceCodeStatus::Approved {
			devices.remove(device_code.as_str());
		}

		Ok(session)
	}
}
