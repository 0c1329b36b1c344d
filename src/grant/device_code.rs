//! Device Authorization Grant.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc8628>
use std::fmt;

use iref::UriBuf;
use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
	DeviceCode, GrantType,
	endpoints::{
		device_authorization::{DeviceAuthorizationRequest, DeviceAuthorizationResponse},
		token::TokenRequest,
	},
	error::{ErrorKind, OAuthError, OAuthResult},
	policy::{ClientPolicy, expires_at},
};

use super::{
	DeviceCodeHooks, DeviceCodeIssuance, TokenGrant, check_bound_client, check_grant_type,
	required,
};

/// Symbols of generated user codes.
///
/// Visually ambiguous characters (`0`/`O`, `1`/`I`) are left out. The
/// alphabet has 32 symbols so that a random byte maps to a symbol without
/// bias.
pub const USER_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const DEFAULT_USER_CODE_LENGTH: usize = 8;

/// Default polling interval, in seconds.
pub const DEFAULT_INTERVAL: u64 = 5;

/// Generates a random user code of `len` symbols of [`USER_CODE_ALPHABET`].
pub fn generate_user_code(len: usize) -> String {
	(0..len)
		.map(|_| {
			let i = usize::from(rng().random::<u8>()) % USER_CODE_ALPHABET.len();
			char::from(USER_CODE_ALPHABET[i])
		})
		.collect()
}

/// Device flow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeConfig {
	/// Page where the user enters the user code.
	pub verification_uri: Option<String>,

	/// Prefix of the verification URI carrying the user code. The user code
	/// is appended to it as is.
	pub verification_uri_complete: Option<String>,

	#[serde(default = "default_user_code_length")]
	pub user_code_length: usize,

	/// Polling interval, in seconds.
	#[serde(default = "default_interval")]
	pub interval: u64,

	/// Name of the device grant type. Deployments using the RFC 8628 URN
	/// set it to [`GrantType::DEVICE_CODE_URN`].
	#[serde(default = "default_grant_type")]
	pub grant_type: GrantType,
}

fn default_user_code_length() -> usize {
	DEFAULT_USER_CODE_LENGTH
}

fn default_interval() -> u64 {
	DEFAULT_INTERVAL
}

fn default_grant_type() -> GrantType {
	GrantType::DeviceCode
}

impl DeviceCodeConfig {
	pub fn new(verification_uri: impl Into<String>, verification_uri_complete: impl Into<String>) -> Self {
		Self {
			verification_uri: Some(verification_uri.into()),
			verification_uri_complete: Some(verification_uri_complete.into()),
			user_code_length: DEFAULT_USER_CODE_LENGTH,
			interval: DEFAULT_INTERVAL,
			grant_type: GrantType::DeviceCode,
		}
	}

	pub fn with_grant_type(self, grant_type: impl Into<GrantType>) -> Self {
		Self {
			grant_type: grant_type.into(),
			..self
		}
	}
}

/// Status of a device authorization session, as reported by
/// [`DeviceCodeHooks::validate_device_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCodeStatus {
	/// The user has not answered yet.
	Pending,

	Approved,

	Denied,

	/// The device polls faster than the configured interval.
	SlowDown,

	Expired,

	/// Any status this crate does not know.
	Unknown(String),
}

impl DeviceCodeStatus {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Pending => "pending",
			Self::Approved => "approved",
			Self::Denied => "denied",
			Self::SlowDown => "slow_down",
			Self::Expired => "expired",
			Self::Unknown(status) => status,
		}
	}

	/// Maps the status to the answer of a polling request: only an approved
	/// session yields a token.
	pub fn check(&self) -> OAuthResult<()> {
		match self {
			Self::Approved => Ok(()),
			Self::Pending => Err(ErrorKind::AuthorizationPending.into()),
			Self::Denied => Err(ErrorKind::AccessDenied.into()),
			Self::SlowDown => Err(ErrorKind::SlowDown.into()),
			Self::Expired => Err(ErrorKind::ExpiredToken.into()),
			Self::Unknown(status) => Err(OAuthError::invalid_grant(format!(
				"unknown device authorization status `{status}`"
			))
			.with_more_info(json!({ "status": status }))),
		}
	}
}

impl From<&str> for DeviceCodeStatus {
	fn from(value: &str) -> Self {
		match value {
			"pending" => Self::Pending,
			"approved" => Self::Approved,
			"denied" => Self::Denied,
			"slow_down" => Self::SlowDown,
			"expired" => Self::Expired,
			other => Self::Unknown(other.to_owned()),
		}
	}
}

impl fmt::Display for DeviceCodeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for DeviceCodeStatus {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.as_str().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for DeviceCodeStatus {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(String::deserialize(deserializer)?.as_str().into())
	}
}

/// Device authorization flow of a single client.
pub struct DeviceCodeFlow<'a, H> {
	policy: &'a ClientPolicy,
	hooks: &'a H,
	verification_uri: UriBuf,
	verification_uri_complete: String,
	user_code_length: usize,
	interval: u64,
	grant_type: GrantType,
}

impl<'a, H> DeviceCodeFlow<'a, H> {
	/// Creates the flow, checking the configuration.
	///
	/// Both verification URIs are mandatory and must be valid URIs.
	pub fn new(policy: &'a ClientPolicy, hooks: &'a H, config: &DeviceCodeConfig) -> OAuthResult<Self> {
		let verification_uri = parse_config_uri(config.verification_uri.as_deref(), "verification_uri")?;
		let complete = parse_config_uri(
			config.verification_uri_complete.as_deref(),
			"verification_uri_complete",
		)?;

		if config.user_code_length == 0 {
			return Err(OAuthError::invalid_request(
				"device flow `user_code_length` must be positive",
			));
		}

		Ok(Self {
			policy,
			hooks,
			verification_uri,
			verification_uri_complete: complete.as_str().to_owned(),
			user_code_length: config.user_code_length,
			interval: config.interval,
			grant_type: config.grant_type.clone(),
		})
	}

	pub fn grant_type(&self) -> &GrantType {
		&self.grant_type
	}

	fn complete_uri(&self, user_code: &str) -> OAuthResult<UriBuf> {
		UriBuf::new(format!("{}{user_code}", self.verification_uri_complete).into_bytes())
			.map_err(|_| OAuthError::server_error("invalid complete verification URI"))
	}
}

fn parse_config_uri(value: Option<&str>, name: &str) -> OAuthResult<UriBuf> {
	let value = value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| OAuthError::invalid_request(format!("device flow requires `{name}`")))?;

	UriBuf::new(value.as_bytes().to_vec())
		.map_err(|_| OAuthError::invalid_request(format!("device flow `{name}` is not a valid URI")))
}

impl<'a, H> DeviceCodeFlow<'a, H>
where
	H: DeviceCodeHooks,
{
	/// Opens a device authorization session.
	pub async fn request_device_code(
		&self,
		request: &DeviceAuthorizationRequest,
		device_code_info: Option<H::Info>,
	) -> OAuthResult<DeviceAuthorizationResponse> {
		self.policy.validate_grant_type(&self.grant_type)?;
		let scopes = self.policy.validate_scopes(request.scope.as_deref())?;

		let user_code = generate_user_code(self.user_code_length);
		let verification_uri_complete = self.complete_uri(&user_code)?;
		let expires_in = self.policy.device_code_expires_in();

		let device_code = self
			.hooks
			.generate_device_code(DeviceCodeIssuance {
				client: self.policy,
				scopes,
				user_code: user_code.clone(),
				interval: self.interval,
				expires_at: expires_at(expires_in)?,
				device_code_info,
			})
			.await?;

		log::debug!(
			"opened device authorization session for client `{}`",
			self.policy.client_id().as_str()
		);

		Ok(DeviceAuthorizationResponse {
			device_code,
			user_code,
			verification_uri: self.verification_uri.clone(),
			verification_uri_complete,
			expires_in,
			interval: self.interval,
		})
	}

	/// Answers a polling request of the device.
	pub async fn get_token(&self, request: &TokenRequest) -> OAuthResult<H::Token> {
		check_grant_type(self.policy, request, &self.grant_type)?;

		let device_code = required(request.device_code.as_deref(), "device_code")?;
		let device_code = DeviceCode::new(device_code)
			.map_err(|_| OAuthError::invalid_request("malformed `device_code`"))?;

		let validation = self.hooks.validate_device_code(device_code).await?;
		check_bound_client(self.policy, &validation.client_id, "device code")?;
		validation.status.check()?;

		let grant = TokenGrant::new(
			self.policy,
			self.grant_type.clone(),
			validation.scopes,
			validation.info,
			self.policy.issues_refresh_token(),
		)?;

		log::debug!(
			"device authorization approved for client `{}`",
			self.policy.client_id().as_str()
		);

		self.hooks.generate_token(grant).await
	}
}

#[cfg(test)]
mod tests {
	use crate::{grant::memory::MemoryHooks, policy::ClientRegistration};

	use super::*;

	fn policy() -> ClientPolicy {
		ClientPolicy::new(
			ClientRegistration::new("tv")
				.with_grant_types("device_code refresh_token")
				.with_scopes("read write"),
		)
		.unwrap()
	}

	fn config() -> DeviceCodeConfig {
		DeviceCodeConfig::new(
			"https://auth.example/device",
			"https://auth.example/device?user_code=",
		)
	}

	fn poll(device_code: &str) -> TokenRequest {
		TokenRequest {
			device_code: Some(device_code.to_owned()),
			..TokenRequest::new("device_code")
		}
	}

	fn scope(value: &str) -> DeviceAuthorizationRequest {
		DeviceAuthorizationRequest {
			client_id: Some("tv".to_owned()),
			scope: Some(value.to_owned()),
		}
	}

	#[test]
	fn user_code_alphabet() {
		let code = generate_user_code(64);
		assert_eq!(code.len(), 64);
		assert!(code.bytes().all(|c| USER_CODE_ALPHABET.contains(&c)));
		assert!(!code.contains(['0', 'O', '1', 'I']));
	}

	#[test]
	fn configuration_requires_both_uris() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		for config in [
			DeviceCodeConfig {
				verification_uri: None,
				..config()
			},
			DeviceCodeConfig {
				verification_uri_complete: None,
				..config()
			},
			DeviceCodeConfig {
				verification_uri: Some("not a uri".to_owned()),
				..config()
			},
			DeviceCodeConfig {
				user_code_length: 0,
				..config()
			},
		] {
			let error = DeviceCodeFlow::new(&policy, &hooks, &config).err().unwrap();
			assert_eq!(error.kind(), ErrorKind::InvalidRequest);
		}
	}

	#[test]
	fn configuration_defaults() {
		let config: DeviceCodeConfig = serde_json::from_value(json!({
			"verification_uri": "https://auth.example/device",
			"verification_uri_complete": "https://auth.example/device?user_code="
		}))
		.unwrap();

		assert_eq!(config, self::config());
	}

	#[tokio::test]
	async fn request_device_code() {
		let policy = policy();
		let hooks = MemoryHooks::default();
		let flow = DeviceCodeFlow::new(&policy, &hooks, &config()).unwrap();

		let response = flow.request_device_code(&scope("read"), None).await.unwrap();

		assert_eq!(response.user_code.len(), DEFAULT_USER_CODE_LENGTH);
		assert_eq!(response.verification_uri.as_str(), "https://auth.example/device");
		assert_eq!(
			response.verification_uri_complete.as_str(),
			format!("https://auth.example/device?user_code={}", response.user_code)
		);
		assert_eq!(response.expires_in, 1800);
		assert_eq!(response.interval, 5);
	}

	#[tokio::test]
	async fn polling_until_approved() {
		let policy = policy();
		let hooks = MemoryHooks::default();
		let flow = DeviceCodeFlow::new(&policy, &hooks, &config()).unwrap();

		let response = flow.request_device_code(&scope("read"), None).await.unwrap();
		let request = poll(response.device_code.as_str());

		let error = flow.get_token(&request).await.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::AuthorizationPending);
		assert!(error.is_retryable());

		hooks.set_device_status(response.device_code.as_str(), DeviceCodeStatus::SlowDown);
		let error = flow.get_token(&request).await.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::SlowDown);

		hooks.set_device_status(response.device_code.as_str(), DeviceCodeStatus::Approved);
		let token = flow.get_token(&request).await.unwrap();
		assert_eq!(token.scope.unwrap().as_str(), "read");
		assert!(token.refresh_token.is_some());

		let error = flow.get_token(&request).await.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::InvalidGrant);
	}

	#[tokio::test]
	async fn terminal_statuses() {
		let policy = policy();
		let hooks = MemoryHooks::default();
		let flow = DeviceCodeFlow::new(&policy, &hooks, &config()).unwrap();

		for (status, kind) in [
			(DeviceCodeStatus::Denied, ErrorKind::AccessDenied),
			(DeviceCodeStatus::Expired, ErrorKind::ExpiredToken),
			(DeviceCodeStatus::from("revoked"), ErrorKind::InvalidGrant),
		] {
			let response = flow.request_device_code(&scope("read"), None).await.unwrap();
			hooks.set_device_status(response.device_code.as_str(), status);

			let error = flow
				.get_token(&poll(response.device_code.as_str()))
				.await
				.unwrap_err();
			assert_eq!(error.kind(), kind);
		}
	}

	#[tokio::test]
	async fn session_of_another_client() {
		let policy = policy();
		let hooks = MemoryHooks::default();

		let other = ClientPolicy::new(
			ClientRegistration::new("console")
				.with_grant_types("device_code")
				.with_scopes("read"),
		)
		.unwrap();
		let response = DeviceCodeFlow::new(&other, &hooks, &config())
			.unwrap()
			.request_device_code(&scope("read"), None)
			.await
			.unwrap();
		hooks.set_device_status(response.device_code.as_str(), DeviceCodeStatus::Approved);

		let error = DeviceCodeFlow::new(&policy, &hooks, &config())
			.unwrap()
			.get_token(&poll(response.device_code.as_str()))
			.await
			.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::InvalidGrant);
	}

	#[tokio::test]
	async fn vendor_grant_type() {
		let policy = ClientPolicy::new(
			ClientRegistration::new("tv")
				.with_grant_types(GrantType::DEVICE_CODE_URN)
				.with_scopes("read"),
		)
		.unwrap();
		let hooks = MemoryHooks::default();
		let flow = DeviceCodeFlow::new(
			&policy,
			&hooks,
			&config().with_grant_type(GrantType::DEVICE_CODE_URN),
		)
		.unwrap();

		let response = flow.request_device_code(&scope("read"), None).await.unwrap();
		hooks.set_device_status(response.device_code.as_str(), DeviceCodeStatus::Approved);

		let error = flow
			.get_token(&poll(response.device_code.as_str()))
			.await
			.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::UnsupportedGrantType);

		let request = TokenRequest {
			grant_type: Some(GrantType::DEVICE_CODE_URN.to_owned()),
			..poll(response.device_code.as_str())
		};
		flow.get_token(&request).await.unwrap();
	}

	#[tokio::test]
	async fn device_grant_not_allowed() {
		let policy = ClientPolicy::new(ClientRegistration::new("tv").with_grant_types("password")).unwrap();
		let hooks = MemoryHooks::default();
		let flow = DeviceCodeFlow::new(&policy, &hooks, &config()).unwrap();

		let error = flow
			.request_device_code(&DeviceAuthorizationRequest::default(), None)
			.await
			.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::UnsupportedGrantType);
	}

	#[test]
	fn status_wire_form() {
		assert_eq!(
			serde_json::to_value(DeviceCodeStatus::SlowDown).unwrap(),
			json!("slow_down")
		);
		assert_eq!(
			serde_json::from_value::<DeviceCodeStatus>(json!("later")).unwrap(),
			DeviceCodeStatus::Unknown("later".to_owned())
		);
	}
}
