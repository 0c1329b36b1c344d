//! Opaque `VSCHAR` strings exchanged between clients and the server.
use str_newtype::StrNewType;

use super::is_vschar;

/// Returns `true` if `bytes` is at least `min` VSCHAR characters long.
const fn is_vschar_string(bytes: &[u8], min: usize) -> bool {
	let mut i = 0;

	while i < bytes.len() {
		if !is_vschar(bytes[i]) {
			return false;
		}

		i += 1
	}

	i >= min
}

macro_rules! vschar_string {
	{
		$(#[$meta:meta])*
		$name:ident / $buf:ident, min = $min:literal
	} => {
		$(#[$meta])*
		#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
		#[newtype(serde, owned($buf, derive(PartialEq, Eq, PartialOrd, Ord, Hash)))]
		pub struct $name(str);

		impl $name {
			/// Validates that the given string is well-formed.
			pub const fn validate_str(s: &str) -> bool {
				Self::validate_bytes(s.as_bytes())
			}

			/// Validates that the given byte slice is well-formed.
			pub const fn validate_bytes(bytes: &[u8]) -> bool {
				is_vschar_string(bytes, $min)
			}
		}
	};
}

vschar_string! {
	/// An OAuth 2.0 client identifier (borrowed).
	///
	/// The grammar allows an empty identifier, but a
	/// [`ClientPolicy`](crate::policy::ClientPolicy) refuses to register one.
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-2.2>
	///
	/// # Grammar
	///
	/// ```abnf
	/// client-id = *VSCHAR
	/// ```
	ClientId / ClientIdBuf, min = 0
}

vschar_string! {
	/// An authorization code (borrowed).
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2>
	///
	/// # Grammar
	///
	/// ```abnf
	/// code = 1*VSCHAR
	/// ```
	Code / CodeBuf, min = 1
}

vschar_string! {
	/// An access token (borrowed).
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#appendix-A.12>
	///
	/// # Grammar
	///
	/// ```abnf
	/// access-token = 1*VSCHAR
	/// ```
	AccessToken / AccessTokenBuf, min = 1
}

vschar_string! {
	/// A refresh token (borrowed).
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#appendix-A.17>
	///
	/// # Grammar
	///
	/// ```abnf
	/// refresh-token = 1*VSCHAR
	/// ```
	RefreshToken / RefreshTokenBuf, min = 1
}

vschar_string! {
	/// A device verification code (borrowed).
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc8628#section-3.2>
	///
	/// # Grammar
	///
	/// ```abnf
	/// device-code = 1*VSCHAR
	/// ```
	DeviceCode / DeviceCodeBuf, min = 1
}

vschar_string! {
	/// An opaque `state` value binding an authorization request to its
	/// callback (borrowed).
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-10.12>
	///
	/// # Grammar
	///
	/// ```abnf
	/// state = 1*VSCHAR
	/// ```
	State / StateBuf, min = 1
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn client_id_may_be_empty() {
		assert!(ClientId::new("").is_ok());
		assert!(ClientId::new("client 123").is_ok());
	}

	#[test]
	fn credentials_must_not_be_empty() {
		assert!(Code::new("").is_err());
		assert!(AccessToken::new("").is_err());
		assert!(RefreshToken::new("").is_err());
		assert!(DeviceCode::new("").is_err());
	}

	#[test]
	fn credentials_accept_visible_chars() {
		assert!(Code::new("~!@#$%^&*()").is_ok());
		assert!(RefreshTokenBuf::new("rt with spaces".to_owned()).is_ok());
		assert!(DeviceCodeBuf::new("GmRhmhcxhwAzkoEqiMEg_DnyEysNkuNhszIySk9eS".to_owned()).is_ok());
	}

	#[test]
	fn control_chars_are_rejected() {
		assert!(ClientId::new("\x00").is_err());
		assert!(Code::new("abc\ndef").is_err());
		assert!(AccessToken::new("abc\x7f").is_err());
		assert!(DeviceCodeBuf::new("\x1f".to_owned()).is_err());
	}
}
