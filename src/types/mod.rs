//! Core OAuth 2.0 types.
//!
//! This module defines the fundamental string types used throughout the OAuth
//! 2.0 protocol, each validated against the grammar specified in
//! [RFC 6749](https://datatracker.ietf.org/doc/html/rfc6749).
//!
//! All string types come in borrowed/owned pairs (e.g. [`Code`] /
//! [`CodeBuf`]) following the same pattern as [`str`] / [`String`].
mod grant_type;
mod identifiers;
mod list;
mod scope;
mod state;

pub use grant_type::*;
pub use identifiers::*;
pub use list::*;
pub use scope::*;
pub use state::*;

/// Returns `true` if the byte is a VSCHAR (visible ASCII character plus
/// space), i.e. in the range `0x20..=0x7E`.
const fn is_vschar(c: u8) -> bool {
	c >= 0x20 && c <= 0x7e
}

/// Returns `true` if the byte is a NQCHAR, i.e. `%x21 / %x23-5B / %x5D-7E`.
const fn is_nqchar(c: u8) -> bool {
	c == 0x21 || (c >= 0x23 && c <= 0x5b) || (c >= 0x5d && c <= 0x7e)
}
