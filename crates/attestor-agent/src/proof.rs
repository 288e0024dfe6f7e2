//! Proof request model handed to the agent for submission.
//!
//! Field names follow the AnonCreds presentation-request layout
//! (`requested_attributes`, `p_type`, `cred_def_id`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Restriction limiting which credentials may satisfy a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeFilter {
    #[serde(rename = "cred_def_id")]
    pub credential_definition_id: String,
}

/// A requested attribute group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAttributeInfo {
    pub name: String,
    pub restrictions: Vec<AttributeFilter>,
}

/// Comparator of a numeric predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateType {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqualTo,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqualTo,
}

impl PredicateType {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
        }
    }
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PredicateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessThanOrEqualTo),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterThanOrEqualTo),
            other => Err(format!(
                "unsupported comparator {:?}, expected one of <, <=, >, >=",
                other
            )),
        }
    }
}

/// A requested numeric predicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPredicateInfo {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    pub restrictions: Vec<AttributeFilter>,
}

/// A complete proof request. Built per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequestSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, ProofAttributeInfo>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, ProofPredicateInfo>,
}

impl ProofRequestSpec {
    /// Whether the request asks for nothing at all.
    pub fn is_empty(&self) -> bool {
        self.requested_attributes.is_empty() && self.requested_predicates.is_empty()
    }

    /// Every restriction across attribute and predicate groups.
    pub fn restrictions(&self) -> impl Iterator<Item = &AttributeFilter> {
        self.requested_attributes
            .values()
            .flat_map(|a| a.restrictions.iter())
            .chain(
                self.requested_predicates
                    .values()
                    .flat_map(|p| p.restrictions.iter()),
            )
    }
}
