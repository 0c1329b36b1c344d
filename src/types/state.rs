use std::ops::{Deref, DerefMut};

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::{State, StateBuf};

impl StateBuf {
	/// Generates a new random, base64url-encoded 128-bit CSRF token.
	pub fn new_random() -> Self {
		Self::new_random_len(16)
	}

	/// Generates a new random, base64url-encoded CSRF token from `len`
	/// random bytes.
	pub fn new_random_len(len: u32) -> Self {
		let random_bytes: Vec<u8> = (0..len).map(|_| rng().random::<u8>()).collect();
		unsafe { Self::new_unchecked(BASE64_URL_SAFE_NO_PAD.encode(random_bytes)) }
	}
}

impl State {
	/// Compares two state values without short-circuiting on the first
	/// differing byte.
	pub fn matches(&self, other: &State) -> bool {
		let a = self.as_str().as_bytes();
		let b = other.as_str().as_bytes();

		if a.len() != b.len() {
			return false;
		}

		a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
	}
}

/// Wrapper that attaches an optional [`State`] to a redirect payload.
///
/// The authorization server echoes the client's `state` on both successful
/// and failed authorization redirects.
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stateful<T> {
	/// Opaque value used by the client to maintain state between the request
	/// and callback.
	///
	/// See: <https://datatracker.ietf.org/doc/html/rfc6749#section-10.12>
	pub state: Option<StateBuf>,

	#[serde(flatten)]
	pub value: T,
}

impl<T> Stateful<T> {
	/// Creates a new [`Stateful`] wrapping the given value with an optional
	/// state token.
	pub fn new(value: T, state: Option<StateBuf>) -> Self {
		Self { state, value }
	}
}

impl<T> Deref for Stateful<T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.value
	}
}

impl<T> DerefMut for Stateful<T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.value
	}
}
