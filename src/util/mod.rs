//! URI query string utilities.
use iref::{
	UriBuf,
	uri::{Query, QueryBuf},
};
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, OAuthResult};

/// Placeholder type for structs that carry no extension fields.
#[derive(
	Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NoExtension {}

/// Appends `value`, encoded as `application/x-www-form-urlencoded`, to the
/// query of `uri`. Existing query parameters are preserved.
pub fn extend_uri_query<T: Serialize>(uri: &mut UriBuf, value: T) -> OAuthResult<()> {
	let query = serialize_concat_query(
		uri.query().map(ToOwned::to_owned).unwrap_or_default(),
		value,
	)?;

	uri.set_query(Some(&*query));
	Ok(())
}

/// Serializes `value` as form-urlencoded data and concatenates it with the
/// existing query string.
pub fn serialize_concat_query<T>(query: QueryBuf, value: T) -> OAuthResult<QueryBuf>
where
	T: Serialize,
{
	let encoded = serde_html_form::to_string(value)
		.map_err(|e| OAuthError::server_error(format!("unable to encode query: {e}")))?;

	let other = QueryBuf::new(encoded.into_bytes())
		.map_err(|_| OAuthError::server_error("encoded query is not a valid URI query"))?;

	concat_query(query, &other)
}

/// Concatenates two query strings with `&` as separator.
///
/// If either query is empty, the other is returned as-is.
pub fn concat_query(query: QueryBuf, other: &Query) -> OAuthResult<QueryBuf> {
	let mut query = query.into_string();

	if !query.is_empty() && !other.is_empty() {
		query.push('&')
	}

	query.push_str(other.as_str());

	QueryBuf::new(query.into_bytes())
		.map_err(|_| OAuthError::server_error("concatenated query is not a valid URI query"))
}
