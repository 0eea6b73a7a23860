//! Ordered, case-insensitively keyed name/value collections.
//!
//! MockServer represents request headers, response headers, query string
//! parameters and path parameters as ordered lists of `{name, values}`
//! entries. Name lookup is case-insensitive, insertion order is preserved,
//! and an upsert replaces values in place rather than appending a duplicate
//! entry.

use serde::{Deserialize, Serialize};

/// A single named entry holding one or more values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValues {
    pub name: String,
    pub values: Vec<String>,
}

impl NameValues {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Ordered collection of [`NameValues`] entries with case-insensitive names.
///
/// Serializes as a plain JSON array of `{name, values}` objects, the form
/// MockServer accepts for headers and parameter collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameValueList(Vec<NameValues>);

impl NameValueList {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive lookup. Returns `None` when no entry exists.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.0[i].values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replace the values of an existing entry in place, or append a new
    /// entry. The original name casing of an existing entry is kept.
    pub fn upsert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.0[i].values = values,
            None => self.0.push(NameValues::new(name, values)),
        }
    }

    /// Append a single value to an existing entry, or create the entry.
    pub fn append_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.0[i].values.push(value),
            None => self.0.push(NameValues::new(name, vec![value])),
        }
    }

    /// Case-insensitive removal. A no-op when the entry is absent.
    pub fn remove(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.0.remove(i);
        }
    }

    /// Treat the entry's value as a comma-separated token set and add
    /// `token` if it is not already present (case-insensitive). The entry is
    /// written back as a single comma-joined value.
    ///
    /// Used for the `Vary` response header, where duplicate tokens are
    /// meaningless.
    pub fn merge_token(&mut self, name: &str, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            return;
        }
        let mut tokens: Vec<String> = self
            .get(name)
            .unwrap_or(&[])
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if !tokens.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            tokens.push(token.to_string());
        }

        self.upsert(name, vec![tokens.join(", ")]);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NameValues> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a NameValueList {
    type Item = &'a NameValues;
    type IntoIter = std::slice::Iter<'a, NameValues>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<String>)> for NameValueList {
    fn from_iter<T: IntoIterator<Item = (N, Vec<String>)>>(iter: T) -> Self {
        let mut list = NameValueList::new();
        for (name, values) in iter {
            list.upsert(name, values);
        }
        list
    }
}
