use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Authorization grant type.
///
/// Unregistered names (e.g. vendor URNs) are carried verbatim as
/// [`GrantType::Extension`].
///
/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.5>
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrantType {
	/// `authorization_code`
	AuthorizationCode,

	/// `client_credentials`
	ClientCredentials,

	/// `password`
	Password,

	/// `refresh_token`
	RefreshToken,

	/// `device_code`
	DeviceCode,

	/// Any other grant type name.
	Extension(String),
}

impl GrantType {
	/// The RFC 8628 device grant URN, for deployments advertising it instead
	/// of the short `device_code` name.
	pub const DEVICE_CODE_URN: &str = "urn:ietf:params:oauth:grant-type:device_code";

	pub fn as_str(&self) -> &str {
		match self {
			Self::AuthorizationCode => "authorization_code",
			Self::ClientCredentials => "client_credentials",
			Self::Password => "password",
			Self::RefreshToken => "refresh_token",
			Self::DeviceCode => "device_code",
			Self::Extension(name) => name,
		}
	}
}

impl From<&str> for GrantType {
	fn from(value: &str) -> Self {
		match value {
			"authorization_code" => Self::AuthorizationCode,
			"client_credentials" => Self::ClientCredentials,
			"password" => Self::Password,
			"refresh_token" => Self::RefreshToken,
			"device_code" => Self::DeviceCode,
			other => Self::Extension(other.to_owned()),
		}
	}
}

impl FromStr for GrantType {
	type Err = Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(s.into())
	}
}

impl fmt::Display for GrantType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for GrantType {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.as_str().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for GrantType {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(String::deserialize(deserializer)?.as_str().into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registered_names() {
		assert_eq!(GrantType::from("authorization_code"), GrantType::AuthorizationCode);
		assert_eq!(GrantType::from("refresh_token"), GrantType::RefreshToken);
		assert_eq!(GrantType::DeviceCode.as_str(), "device_code");
	}

	#[test]
	fn extension_names_are_kept_verbatim() {
		let urn = GrantType::from(GrantType::DEVICE_CODE_URN);
		assert_eq!(urn, GrantType::Extension(GrantType::DEVICE_CODE_URN.to_owned()));
		assert_eq!(urn.to_string(), GrantType::DEVICE_CODE_URN);
	}

	#[test]
	fn serde_uses_wire_names() {
		let json = serde_json::to_string(&GrantType::ClientCredentials).unwrap();
		assert_eq!(json, "\"client_credentials\"");
		let parsed: GrantType = serde_json::from_str("\"password\"").unwrap();
		assert_eq!(parsed, GrantType::Password);
	}
}
