//! `Content-Security-Policy` header value builder.
//!
//! A policy is described as an ordered list of directives, each named in
//! camelCase (`scriptSrcElem`) or in its wire form (`script-src-elem`), and
//! serialized into a single header value:
//!
//! ```text
//! base-uri 'self'; object-src 'none'; script-src 'self' 'nonce-abc123'
//! ```
//!
//! Output order follows input order. Building is pure and allocates a fresh
//! string each call, so it is meant to run once per response with the
//! request nonce embedded in `script-src`.
//!
//! Two mistakes abort the build instead of producing a degraded header:
//! the same directive given twice, and a `;` or line break inside a
//! directive, which would let a value open a directive of its own.

pub mod names;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CspError {
    #[error("directive \"{name}\" is specified more than once")]
    DuplicateDirective { name: String },

    #[error("directive \"{name}\" contains invalid characters (semicolon or newline)")]
    InvalidCharacters { name: String },

    #[error("directive \"{name}\" is a flag and cannot take extra tokens")]
    TokensOnFlag { name: String },
}

/// Value of a single directive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDirectiveValue")]
pub enum DirectiveValue {
    /// Emits the bare directive name, e.g. `upgrade-insecure-requests`.
    Flag,
    /// Omits the directive.
    Absent,
    /// Emits `name value` verbatim.
    Single(String),
    /// Emits `name tok1 tok2 ...`. Absent and empty tokens are dropped, and
    /// the directive is omitted when nothing is left.
    List(Vec<Option<String>>),
}

/// Shape of a directive value in a config file: `true`, `"token"` or `["a", "b"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDirectiveValue {
    Bool(bool),
    Single(String),
    List(Vec<Option<String>>),
}

impl From<RawDirectiveValue> for DirectiveValue {
    fn from(raw: RawDirectiveValue) -> Self {
        match raw {
            RawDirectiveValue::Bool(flag) => flag.into(),
            RawDirectiveValue::Single(value) => DirectiveValue::Single(value),
            RawDirectiveValue::List(tokens) => DirectiveValue::List(tokens),
        }
    }
}

impl From<bool> for DirectiveValue {
    fn from(flag: bool) -> Self {
        if flag {
            DirectiveValue::Flag
        } else {
            DirectiveValue::Absent
        }
    }
}

impl From<&str> for DirectiveValue {
    fn from(value: &str) -> Self {
        DirectiveValue::Single(value.to_string())
    }
}

impl From<String> for DirectiveValue {
    fn from(value: String) -> Self {
        DirectiveValue::Single(value)
    }
}

impl From<Vec<String>> for DirectiveValue {
    fn from(tokens: Vec<String>) -> Self {
        DirectiveValue::List(tokens.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for DirectiveValue {
    fn from(tokens: Vec<&str>) -> Self {
        DirectiveValue::List(tokens.into_iter().map(|t| Some(t.to_string())).collect())
    }
}

impl From<Vec<Option<String>>> for DirectiveValue {
    fn from(tokens: Vec<Option<String>>) -> Self {
        DirectiveValue::List(tokens)
    }
}

impl From<Vec<Option<&str>>> for DirectiveValue {
    fn from(tokens: Vec<Option<&str>>) -> Self {
        DirectiveValue::List(
            tokens
                .into_iter()
                .map(|t| t.map(str::to_string))
                .collect(),
        )
    }
}

impl<const N: usize> From<[&str; N]> for DirectiveValue {
    fn from(tokens: [&str; N]) -> Self {
        Vec::from(tokens).into()
    }
}

impl<T: Into<DirectiveValue>> From<Option<T>> for DirectiveValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DirectiveValue::Absent, Into::into)
    }
}

/// Ordered `(name, value)` pairs, the single input shape of [`build`].
///
/// Maps convert through `From<IndexMap<..>>`, which keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    entries: Vec<(String, DirectiveValue)>,
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<DirectiveValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DirectiveValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn build(&self) -> Result<String, CspError> {
        build(self)
    }
}

impl<K, V> FromIterator<(K, V)> for Directives
where
    K: Into<String>,
    V: Into<DirectiveValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut directives = Directives::new();
        directives.extend(iter);
        directives
    }
}

impl<K, V> Extend<(K, V)> for Directives
where
    K: Into<String>,
    V: Into<DirectiveValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.push(name, value);
        }
    }
}

impl From<IndexMap<String, DirectiveValue>> for Directives {
    fn from(map: IndexMap<String, DirectiveValue>) -> Self {
        map.into_iter().collect()
    }
}

/// Converts a camelCase directive name to its wire form.
///
/// A hyphen goes between every ASCII lowercase letter and a following ASCII
/// uppercase letter, then the whole name is lowercased. Names already in
/// wire form are returned unchanged.
///
/// Only ASCII letters are lowercased. Directive names are ASCII, and a
/// non-ASCII letter passes through as is.
pub fn wire_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase()) {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    out
}

fn has_invalid_chars(s: &str) -> bool {
    s.contains([';', '\r', '\n'])
}

/// Serializes `directives` into a header value, segments joined by `"; "`.
///
/// Fails without partial output on the first duplicate wire name or on a
/// segment containing `;`, `\r` or `\n`.
pub fn build(directives: &Directives) -> Result<String, CspError> {
    let mut segments: Vec<String> = Vec::with_capacity(directives.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(directives.len());

    for (raw_name, value) in directives.iter() {
        let name = wire_name(raw_name);
        if !seen.insert(name.clone()) {
            return Err(CspError::DuplicateDirective {
                name: raw_name.to_string(),
            });
        }

        let value = match value {
            DirectiveValue::Flag => None,
            DirectiveValue::Absent => continue,
            DirectiveValue::Single(value) => Some(value.clone()),
            DirectiveValue::List(tokens) => {
                let kept: Vec<&str> = tokens
                    .iter()
                    .filter_map(|t| t.as_deref())
                    .filter(|t| !t.is_empty())
                    .collect();
                if kept.is_empty() {
                    continue;
                }
                Some(kept.join(" "))
            }
        };

        let segment = match value {
            Some(value) if !value.is_empty() => format!("{name} {value}"),
            _ => name,
        };
        if has_invalid_chars(&segment) {
            return Err(CspError::InvalidCharacters {
                name: raw_name.to_string(),
            });
        }
        segments.push(segment);
    }

    Ok(segments.join("; "))
}
