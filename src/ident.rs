//! Qualified identifiers and the naming policy that turns vendor-supplied
//! names into legal generated names.
//!
//! An [`Identifier`] is the only way one declaration refers to another, so
//! it is cheap to clone, totally ordered (namespace first, then name) and
//! serializes as the flat string `namespace/Name`.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// IDENTIFIER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    namespace: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("invalid identifier {0:?}: expected `namespace/Name`")]
    Malformed(String),
    #[error("identifier {name:?} has an empty namespace")]
    EmptyNamespace { name: String },
    #[error("invalid local name {name:?} in {namespace:?}: must be non-empty and contain no '/'")]
    InvalidName { namespace: String, name: String },
}

impl Identifier {
    /// The namespace must be non-empty and the name non-empty without a
    /// `/`, so that `namespace/Name` always parses back to the same pair.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, IdentifierError> {
        let (namespace, name) = (namespace.into(), name.into());
        if name.is_empty() || name.contains('/') {
            return Err(IdentifierError::InvalidName { namespace, name });
        }
        if namespace.is_empty() {
            return Err(IdentifierError::EmptyNamespace { name });
        }
        Ok(Self { namespace, name })
    }
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    /// The local name is everything after the last `/`; namespaces may
    /// themselves contain slashes (`microsoft.network/v1api20201101`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('/') {
            Some((ns, name)) => Self::new(ns, name),
            None => Err(IdentifierError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NAMING POLICY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// PascalCase, e.g. type and test names.
    Exported,
    /// camelCase, e.g. fields and locals.
    NotExported,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("cannot derive an identifier from {input:?}: no alphanumeric content")]
    Empty { input: String },
    #[error("cannot derive an identifier from {input:?}: {candidate:?} starts with a digit")]
    LeadingDigit { input: String, candidate: String },
}

/// Words that cannot be used verbatim as a non-exported name in generated code.
const RESERVED_WORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn",
];

static SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9]+").expect("separator pattern is valid")
});

/// Derives legal identifiers from arbitrary vendor names.
///
/// Renames are consulted before any word splitting; they cover names whose
/// mechanical transformation is ugly or ambiguous (`$schema`, `*`).
#[derive(Debug, Clone)]
pub struct IdentifierFactory {
    renames: BTreeMap<String, String>,
}

impl Default for IdentifierFactory {
    fn default() -> Self {
        let mut renames = BTreeMap::new();
        renames.insert("$schema".to_string(), "Schema".to_string());
        renames.insert("*".to_string(), "Star".to_string());
        Self { renames }
    }
}

impl IdentifierFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn create_identifier(&self, input: &str, visibility: Visibility) -> Result<String, NamingError> {
        let source = self.renames.get(input).map(String::as_str).unwrap_or(input);
        let words = split_words(source);
        if words.is_empty() {
            return Err(NamingError::Empty { input: input.to_string() });
        }

        let mut out = String::with_capacity(source.len());
        for (i, word) in words.iter().enumerate() {
            match (visibility, i) {
                (Visibility::NotExported, 0) => out.push_str(&word.to_lowercase()),
                _ => out.push_str(&capitalize(word)),
            }
        }

        if out.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(NamingError::LeadingDigit { input: input.to_string(), candidate: out });
        }
        if visibility == Visibility::NotExported && RESERVED_WORDS.contains(&out.as_str()) {
            out.push('_');
        }
        Ok(out)
    }
}

/// Split on separators, then on case boundaries (`vmSize` → `vm`,`Size`;
/// `HTTPServer` → `HTTP`,`Server`).
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    for chunk in SEPARATORS.split(s).filter(|c| !c.is_empty()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut start = 0;
        for i in 1..chars.len() {
            let prev = chars[i - 1];
            let cur = chars[i];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let boundary = (prev.is_lowercase() && cur.is_uppercase())
                || (prev.is_uppercase() && cur.is_uppercase() && next_is_lower);
            if boundary {
                words.push(chars[start..i].iter().collect());
                start = i;
            }
        }
        words.push(chars[start..].iter().collect());
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut cs = word.chars();
    match cs.next() {
        Some(first) => first.to_uppercase().chain(cs).collect(),
        None => String::new(),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_parses_on_last_slash() {
        let id: Identifier = "microsoft.network/v1api20201101/VirtualNetwork".parse().unwrap();
        assert_eq!(id.namespace(), "microsoft.network/v1api20201101");
        assert_eq!(id.name(), "VirtualNetwork");
        assert_eq!(id.to_string(), "microsoft.network/v1api20201101/VirtualNetwork");
        assert!("NoNamespace".parse::<Identifier>().is_err());
        assert!("ns/".parse::<Identifier>().is_err());
    }

    #[test]
    fn identifiers_order_by_namespace_then_name() {
        let a = Identifier::new("a", "Z").unwrap();
        let b = Identifier::new("b", "A").unwrap();
        let c = Identifier::new("b", "B").unwrap();
        let mut v = vec![c.clone(), a.clone(), b.clone()];
        v.sort();
        assert_eq!(v, vec![a, b, c]);
    }

    #[test]
    fn identifier_serializes_as_string() {
        let id = Identifier::new("ns", "Thing").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ns/Thing\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn pairs_that_would_not_survive_a_round_trip_are_rejected() {
        assert_eq!(
            Identifier::new("ns", "a/b"),
            Err(IdentifierError::InvalidName { namespace: "ns".into(), name: "a/b".into() })
        );
        assert_eq!(Identifier::new("", "X"), Err(IdentifierError::EmptyNamespace { name: "X".into() }));
        assert!(Identifier::new("ns", "").is_err());
        assert!(serde_json::from_str::<Identifier>("\"/X\"").is_err());

        // Everything `new` accepts reloads as the same pair.
        let nested = Identifier::new("microsoft.network/v1", "Subnet").unwrap();
        let back: Identifier = serde_json::from_str(&serde_json::to_string(&nested).unwrap()).unwrap();
        assert_eq!((back.namespace(), back.name()), ("microsoft.network/v1", "Subnet"));
    }

    #[test]
    fn exported_names_are_pascal_case() {
        let f = IdentifierFactory::new();
        assert_eq!(f.create_identifier("vm-size", Visibility::Exported).unwrap(), "VmSize");
        assert_eq!(f.create_identifier("HTTPServer", Visibility::Exported).unwrap(), "HTTPServer");
        assert_eq!(f.create_identifier("properties_format", Visibility::Exported).unwrap(), "PropertiesFormat");
        assert_eq!(f.create_identifier("$schema", Visibility::Exported).unwrap(), "Schema");
    }

    #[test]
    fn internal_names_are_camel_case_and_escaped() {
        let f = IdentifierFactory::new();
        assert_eq!(f.create_identifier("ProvisioningState", Visibility::NotExported).unwrap(), "provisioningState");
        assert_eq!(f.create_identifier("type", Visibility::NotExported).unwrap(), "type_");
    }

    #[test]
    fn illegal_names_are_rejected() {
        let f = IdentifierFactory::new();
        assert!(matches!(f.create_identifier("--", Visibility::Exported), Err(NamingError::Empty { .. })));
        assert!(matches!(
            f.create_identifier("2ndGen", Visibility::Exported),
            Err(NamingError::LeadingDigit { .. })
        ));
    }
}
