//! [`axum`] integration.
use ::axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
	endpoints::token::{TokenResponse, TokenType},
	error::OAuthError,
};

use super::{AuthorizationServerMetadata, error_response, json_response, token_response};

fn into_axum(response: http::Response<Vec<u8>>) -> Response {
	let (parts, body) = response.into_parts();
	Response::from_parts(parts, Body::from(body))
}

impl IntoResponse for OAuthError {
	fn into_response(self) -> Response {
		(&self).into_response()
	}
}

impl IntoResponse for &OAuthError {
	fn into_response(self) -> Response {
		into_axum(error_response(self))
	}
}

impl<T, E> IntoResponse for TokenResponse<T, E>
where
	T: TokenType,
	E: Serialize,
{
	fn into_response(self) -> Response {
		match token_response(&self) {
			Ok(response) => into_axum(response),
			Err(e) => e.into_response(),
		}
	}
}

impl<P> IntoResponse for AuthorizationServerMetadata<P>
where
	P: Serialize,
{
	fn into_response(self) -> Response {
		(&self).into_response()
	}
}

impl<P> IntoResponse for &AuthorizationServerMetadata<P>
where
	P: Serialize,
{
	fn into_response(self) -> Response {
		match json_response(http::StatusCode::OK, self) {
			Ok(response) => into_axum(response),
			Err(e) => e.into_response(),
		}
	}
}
