//! Proof Key for Code Exchange by OAuth Public Clients
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc7636>
use std::{borrow::Cow, str::FromStr};

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use str_newtype::StrNewType;

/// Code challenge bound to an authorization code, with its transformation
/// method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PkceCodeChallengeAndMethod {
	#[serde(rename = "code_challenge")]
	pub challenge: PkceCodeChallengeBuf,

	#[serde(rename = "code_challenge_method")]
	pub method: PkceCodeChallengeMethod,
}

impl PkceCodeChallengeAndMethod {
	/// Creates a new [`PkceCodeChallengeAndMethod`] from the given verifier and
	/// method.
	pub fn from_code_verifier(
		code_verifier: &PkceCodeVerifier,
		method: PkceCodeChallengeMethod,
	) -> Self {
		Self {
			// Verifier and challenge share the same grammar, and an S256
			// digest is always 43 unreserved characters.
			challenge: PkceCodeChallengeBuf(method.transform(code_verifier.as_str()).into_owned()),
			method,
		}
	}

	/// Generate a new random, base64-encoded SHA-256 PKCE challenge and
	/// verifier.
	pub fn new_random_sha256() -> (Self, PkceCodeVerifierBuf) {
		let code_verifier = PkceCodeVerifierBuf::new_random_len(32);
		(
			Self::from_code_verifier(&code_verifier, PkceCodeChallengeMethod::S256),
			code_verifier,
		)
	}

	/// Returns `true` if `code_verifier` transforms into this challenge.
	pub fn is_verified_by(&self, code_verifier: &str) -> bool {
		self.method.verify(code_verifier, &self.challenge)
	}
}

/// Code Challenge.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc7636#section-4.2>
///
/// # Grammar
///
/// ```abnf
/// code-challenge = 43*128unreserved
/// unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
/// ALPHA = %x41-5A / %x61-7A
/// DIGIT = %x30-39
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(
	serde,
	owned(PkceCodeChallengeBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash))
)]
pub struct PkceCodeChallenge(str);

impl PkceCodeChallenge {
	/// Validates that the given string is a well-formed PKCE code challenge.
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	/// Validates that the given byte slice is a well-formed PKCE code
	/// challenge.
	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		validate_verifier_or_challenge(bytes)
	}
}

/// Error returned when parsing an invalid PKCE code challenge method string.
#[derive(Debug, thiserror::Error)]
#[error("invalid PKCE `code_challenge_method` value")]
pub struct InvalidPkceCodeChallengeMethod;

/// String representation of the `plain` code challenge method.
pub const PKCE_CODE_CHALLENGE_METHOD_PLAIN: &str = "plain";

/// String representation of the `S256` code challenge method.
pub const PKCE_CODE_CHALLENGE_METHOD_S256: &str = "S256";

/// PKCE code challenge method.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc7636#section-4.2>
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PkceCodeChallengeMethod {
	/// The code challenge is the plain code verifier (not recommended).
	Plain,

	/// The code challenge is the BASE64URL-encoded SHA-256 hash of the
	/// code verifier.
	S256,
}

impl PkceCodeChallengeMethod {
	/// Transforms a code verifier into a code challenge using this method.
	///
	/// The verifier grammar is not checked here: a malformed verifier simply
	/// fails to match its challenge.
	pub fn transform<'a>(&self, code_verifier: &'a str) -> Cow<'a, str> {
		match self {
			Self::Plain => Cow::Borrowed(code_verifier),
			Self::S256 => {
				let digest = Sha256::digest(code_verifier.as_bytes());
				Cow::Owned(BASE64_URL_SAFE_NO_PAD.encode(digest))
			}
		}
	}

	/// Returns `true` if `code_verifier` transforms into `challenge`.
	pub fn verify(&self, code_verifier: &str, challenge: &PkceCodeChallenge) -> bool {
		let computed = self.transform(code_verifier);
		let expected = challenge.as_str();

		computed.len() == expected.len()
			&& computed
				.bytes()
				.zip(expected.bytes())
				.fold(0u8, |acc, (a, b)| acc | (a ^ b))
				== 0
	}

	/// Returns the string representation of this method.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Plain => PKCE_CODE_CHALLENGE_METHOD_PLAIN,
			Self::S256 => PKCE_CODE_CHALLENGE_METHOD_S256,
		}
	}
}

impl FromStr for PkceCodeChallengeMethod {
	type Err = InvalidPkceCodeChallengeMethod;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			PKCE_CODE_CHALLENGE_METHOD_PLAIN => Ok(Self::Plain),
			PKCE_CODE_CHALLENGE_METHOD_S256 => Ok(Self::S256),
			_ => Err(InvalidPkceCodeChallengeMethod),
		}
	}
}

impl Serialize for PkceCodeChallengeMethod {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.as_str().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for PkceCodeChallengeMethod {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		String::deserialize(deserializer)?
			.parse()
			.map_err(serde::de::Error::custom)
	}
}

/// Code Verifier.
///
/// See: <https://datatracker.ietf.org/doc/html/rfc7636#section-4.1>
///
/// # Grammar
///
/// ```abnf
/// code-verifier = 43*128unreserved
/// unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
/// ALPHA = %x41-5A / %x61-7A
/// DIGIT = %x30-39
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, StrNewType)]
#[newtype(
	serde,
	owned(PkceCodeVerifierBuf, derive(PartialEq, Eq, PartialOrd, Ord, Hash))
)]
pub struct PkceCodeVerifier(str);

impl PkceCodeVerifier {
	/// Validates that the given string is a well-formed PKCE code verifier.
	pub const fn validate_str(s: &str) -> bool {
		Self::validate_bytes(s.as_bytes())
	}

	/// Validates that the given byte slice is a well-formed PKCE code
	/// verifier.
	pub const fn validate_bytes(bytes: &[u8]) -> bool {
		validate_verifier_or_challenge(bytes)
	}
}

impl PkceCodeVerifierBuf {
	/// Generate a new random, base64-encoded PKCE code verifier.
	///
	/// # Arguments
	///
	/// * `len` - Number of random bytes to generate, prior to base64-encoding.
	///   The value must be in the range 32 to 96 inclusive in order to generate a verifier
	///   with a suitable length.
	///
	/// # Panics
	///
	/// This method panics if `len` is outside of `32..=96`.
	pub fn new_random_len(len: u32) -> Self {
		// 43 to 128 characters once base64url-encoded.
		assert!((32..=96).contains(&len));
		let random_bytes: Vec<u8> = (0..len).map(|_| rng().random::<u8>()).collect();
		Self(BASE64_URL_SAFE_NO_PAD.encode(random_bytes))
	}
}

const fn validate_verifier_or_challenge(bytes: &[u8]) -> bool {
	if bytes.len() < 43 || bytes.len() > 128 {
		return false;
	}

	let mut i = 0;

	while i < bytes.len() {
		if !bytes[i].is_ascii_alphanumeric() && !matches!(bytes[i], b'-' | b'.' | b'_' | b'~') {
			return false;
		}

		i += 1
	}

	true
}

#[cfg(test)]
mod tests {
	use super::*;

	// 43 characters of valid unreserved chars.
	const MIN_VALID: &str = "abcdefghijklmnopqrstuvwxyz01234567890123456";

	// RFC 7636 Appendix B.
	const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
	const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

	#[test]
	fn challenge_length_bounds() {
		assert!(PkceCodeChallenge::new(MIN_VALID).is_ok());
		assert!(PkceCodeChallenge::new(&MIN_VALID[..42]).is_err());
		assert!(PkceCodeChallenge::new(&"a".repeat(128)).is_ok());
		assert!(PkceCodeChallenge::new(&"a".repeat(129)).is_err());
	}

	#[test]
	fn challenge_charset() {
		assert!(PkceCodeChallenge::new("abcdefghijklmnopqrstuvwxyz-._~ABCDEFGHIJKLMN").is_ok());
		assert!(PkceCodeChallenge::new(&format!("+{}", &MIN_VALID[1..])).is_err());
		assert!(PkceCodeChallenge::new(&format!(" {}", &MIN_VALID[1..])).is_err());
	}

	#[test]
	fn s256_matches_rfc_vector() {
		assert_eq!(
			PkceCodeChallengeMethod::S256.transform(RFC_VERIFIER),
			RFC_CHALLENGE
		);
	}

	#[test]
	fn s256_is_unpadded_base64url_sha256() {
		let expected = BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(b"verifier1"));
		assert_eq!(PkceCodeChallengeMethod::S256.transform("verifier1"), expected);
		assert!(!expected.contains('='));
	}

	#[test]
	fn plain_is_identity() {
		assert_eq!(PkceCodeChallengeMethod::Plain.transform("verifier1"), "verifier1");
	}

	#[test]
	fn verify_rejects_other_verifier() {
		let challenge = PkceCodeChallenge::new(RFC_CHALLENGE).unwrap();
		assert!(PkceCodeChallengeMethod::S256.verify(RFC_VERIFIER, challenge));
		assert!(!PkceCodeChallengeMethod::S256.verify("other", challenge));
		assert!(!PkceCodeChallengeMethod::Plain.verify(RFC_VERIFIER, challenge));
	}

	#[test]
	fn parse_challenge_method() {
		assert_eq!(
			"S256".parse::<PkceCodeChallengeMethod>().unwrap(),
			PkceCodeChallengeMethod::S256,
		);
		assert_eq!(
			"plain".parse::<PkceCodeChallengeMethod>().unwrap(),
			PkceCodeChallengeMethod::Plain,
		);
		assert!("s256".parse::<PkceCodeChallengeMethod>().is_err());
	}

	#[test]
	fn random_pair_verifies() {
		let (challenge, verifier) = PkceCodeChallengeAndMethod::new_random_sha256();
		assert!(PkceCodeVerifier::new(verifier.as_str()).is_ok());
		assert!(challenge.is_verified_by(verifier.as_str()));
	}

	#[test]
	fn plain_challenge_equals_verifier() {
		let verifier = PkceCodeVerifierBuf::new_random_len(96);
		let challenge = PkceCodeChallengeAndMethod::from_code_verifier(
			&verifier,
			PkceCodeChallengeMethod::Plain,
		);
		assert_eq!(challenge.challenge.as_str(), verifier.as_str());
	}
}
