use serde::{Deserialize, Serialize};

/// A list of names configured either as one space-separated string or as a
/// sequence of strings.
///
/// Values are split on whitespace, empty entries are dropped and duplicates
/// are removed, keeping the first occurrence.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SpaceSeparated(Vec<String>);

impl SpaceSeparated {
	/// Normalizes the given entries.
	pub fn new<T: AsRef<str>>(entries: impl IntoIterator<Item = T>) -> Self {
		let mut result: Vec<String> = Vec::new();

		for entry in entries {
			for item in entry.as_ref().split_whitespace() {
				if !result.iter().any(|existing| existing == item) {
					result.push(item.to_owned());
				}
			}
		}

		Self(result)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, String> {
		self.0.iter()
	}

	pub fn into_vec(self) -> Vec<String> {
		self.0
	}
}

impl From<&str> for SpaceSeparated {
	fn from(value: &str) -> Self {
		Self::new([value])
	}
}

impl From<String> for SpaceSeparated {
	fn from(value: String) -> Self {
		Self::new([value])
	}
}

impl<T: AsRef<str>> From<Vec<T>> for SpaceSeparated {
	fn from(value: Vec<T>) -> Self {
		Self::new(value)
	}
}

impl<T: AsRef<str>, const N: usize> From<[T; N]> for SpaceSeparated {
	fn from(value: [T; N]) -> Self {
		Self::new(value)
	}
}

impl<'de> Deserialize<'de> for SpaceSeparated {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr {
			Joined(String),
			List(Vec<String>),
		}

		Ok(match Repr::deserialize(deserializer)? {
			Repr::Joined(value) => Self::new([value]),
			Repr::List(values) => Self::new(values),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn string_and_list_forms_agree() {
		let joined = SpaceSeparated::from("read  write read");
		let list = SpaceSeparated::from(vec!["read", "write", "read"]);
		assert_eq!(joined, list);
		assert_eq!(joined.into_vec(), ["read", "write"]);
	}

	#[test]
	fn deserializes_both_forms() {
		let joined: SpaceSeparated = serde_json::from_str("\"a b\"").unwrap();
		let list: SpaceSeparated = serde_json::from_str("[\"a\", \"b\", \"a\"]").unwrap();
		assert_eq!(joined, list);
	}

	#[test]
	fn blank_is_empty() {
		assert!(SpaceSeparated::from(" ").is_empty());
		assert!(SpaceSeparated::default().is_empty());
	}
}
