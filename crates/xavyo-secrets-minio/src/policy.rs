//! IAM policy documents and their structural validation.
//!
//! A document is validated before it is ever registered with the backend.
//! The rules follow the object-storage IAM model:
//!
//! - `Version` is `2012-10-17` or empty
//! - `Effect` is `Allow` or `Deny`
//! - every action is `*` or `<prefix>:<Name>` with prefix `s3`, `admin`, `kms` or `sts`
//! - statements with `s3` actions name at least one `arn:aws:s3:::` resource
//! - statements with only `admin`/`kms` actions name no resources
//! - non-empty `Sid` values are unique within a document

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The only policy language version the backend accepts.
pub const POLICY_VERSION: &str = "2012-10-17";

const S3_RESOURCE_PREFIX: &str = "arn:aws:s3:::";

/// A policy document as carried in `EnsurePolicy` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default)]
    pub version: String,

    #[serde(rename = "Statement", default)]
    pub statement: Vec<PolicyStatement>,
}

/// One statement of a [`PolicyDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Action", default, deserialize_with = "one_or_many")]
    pub action: Vec<String>,

    #[serde(
        rename = "Resource",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resource: Vec<String>,

    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Statement effect.
///
/// Unknown values decode into [`Effect::Other`] so that they are reported
/// by [`PolicyDocument::validate`] rather than failing the whole statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
    Other(String),
}

impl Effect {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
            Effect::Other(value) => value,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(match value.as_str() {
            "Allow" => Effect::Allow,
            "Deny" => Effect::Deny,
            _ => Effect::Other(value),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// `Action` and `Resource` accept a bare string as well as a list.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Reason a policy document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyValidationError {
    #[error("unsupported policy version '{0}'")]
    UnsupportedVersion(String),

    #[error("statement {index}: invalid effect '{effect}'")]
    InvalidEffect { index: usize, effect: String },

    #[error("statement {index}: no actions")]
    MissingAction { index: usize },

    #[error("statement {index}: invalid action '{action}'")]
    InvalidAction { index: usize, action: String },

    #[error("statement {index}: s3 actions require at least one resource")]
    MissingResource { index: usize },

    #[error("statement {index}: invalid resource '{resource}'")]
    InvalidResource { index: usize, resource: String },

    #[error("statement {index}: admin and kms actions do not take resources")]
    UnexpectedResource { index: usize },

    #[error("duplicate statement id '{0}'")]
    DuplicateSid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    /// `*` or `s3:*`-style; scoped by resources.
    Storage,
    /// `admin:` and `kms:` actions; not scoped by resources.
    Service,
    Sts,
}

fn classify_action(action: &str) -> Option<ActionKind> {
    if action == "*" {
        return Some(ActionKind::Storage);
    }
    let (prefix, name) = action.split_once(':')?;
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '*' || c == '?');
    if !valid_name {
        return None;
    }
    match prefix {
        "s3" => Some(ActionKind::Storage),
        "admin" | "kms" => Some(ActionKind::Service),
        "sts" => Some(ActionKind::Sts),
        _ => None,
    }
}

impl PolicyDocument {
    /// Check the document is well-formed enough to register.
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        if !self.version.is_empty() && self.version != POLICY_VERSION {
            return Err(PolicyValidationError::UnsupportedVersion(
                self.version.clone(),
            ));
        }

        let mut sids = HashSet::new();
        for (index, statement) in self.statement.iter().enumerate() {
            statement.validate(index)?;
            if let Some(sid) = statement.sid.as_deref().filter(|s| !s.is_empty()) {
                if !sids.insert(sid) {
                    return Err(PolicyValidationError::DuplicateSid(sid.to_string()));
                }
            }
        }
        Ok(())
    }
}

impl PolicyStatement {
    fn validate(&self, index: usize) -> Result<(), PolicyValidationError> {
        if let Effect::Other(effect) = &self.effect {
            return Err(PolicyValidationError::InvalidEffect {
                index,
                effect: effect.clone(),
            });
        }

        if self.action.is_empty() {
            return Err(PolicyValidationError::MissingAction { index });
        }

        let mut storage = false;
        let mut service_only = true;
        for action in &self.action {
            match classify_action(action) {
                Some(ActionKind::Storage) => {
                    storage = true;
                    service_only = false;
                }
                Some(ActionKind::Service) => {}
                Some(ActionKind::Sts) => service_only = false,
                None => {
                    return Err(PolicyValidationError::InvalidAction {
                        index,
                        action: action.clone(),
                    })
                }
            }
        }

        if storage {
            if self.resource.is_empty() {
                return Err(PolicyValidationError::MissingResource { index });
            }
            if let Some(resource) = self.resource.iter().find(|r| {
                r.strip_prefix(S3_RESOURCE_PREFIX)
                    .map_or(true, |rest| rest.is_empty())
            }) {
                return Err(PolicyValidationError::InvalidResource {
                    index,
                    resource: resource.clone(),
                });
            }
        } else if service_only && !self.resource.is_empty() {
            return Err(PolicyValidationError::UnexpectedResource { index });
        }

        Ok(())
    }
}
