//! Server-side validation and orchestration of [OAuth 2.0][rfc6749] grant
//! flows, following the OAuth 2.1 profile.
//!
//! The crate decides whether a grant may proceed. Given untrusted request
//! parameters and the registered [`ClientPolicy`](policy::ClientPolicy) of a
//! client, each flow runs a fixed validation pipeline and delegates minting
//! and storage of codes and tokens to hooks implemented by the embedding
//! server. Supported grants:
//!
//! - [RFC 6749][rfc6749] authorization code, client credentials, resource
//!   owner password and refresh token grants;
//! - [RFC 7636][rfc7636] Proof Key for Code Exchange (PKCE);
//! - [RFC 8628][rfc8628] Device Authorization Grant.
//!
//! # Modules
//!
//! - [`error`]: OAuth error taxonomy.
//! - [`policy`]: client registration and policy checks.
//! - [`grant`]: hook traits and grant flows.
//! - [`endpoints`]: request and response wire shapes.
//! - [`ext`]: protocol extensions (PKCE).
//! - [`server`]: HTTP responses, error redirects and
//!   [RFC 8414][rfc8414] metadata.
//! - [`util`]: URI query string utilities.
//!
//! Core OAuth 2.0 types ([`AccessToken`], [`ClientId`], [`Code`], [`Scope`],
//! [`State`], etc.) are re-exported at the crate root.
//!
//! [rfc6749]: https://datatracker.ietf.org/doc/html/rfc6749
//! [rfc7636]: https://datatracker.ietf.org/doc/html/rfc7636
//! [rfc8414]: https://datatracker.ietf.org/doc/html/rfc8414
//! [rfc8628]: https://datatracker.ietf.org/doc/html/rfc8628
pub use http;

pub mod endpoints;
pub mod error;
pub mod ext;
pub mod grant;
pub mod policy;
pub mod server;
mod types;
pub mod util;

pub use error::{ErrorKind, OAuthError, OAuthResult};
pub use types::*;
