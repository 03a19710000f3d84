//! Creation/rotation statement parsing.
//!
//! A statement is a JSON object:
//!
//! ```json
//! {"EnsurePolicy": [{"Name": "ro", "Policy": {"Version": "2012-10-17", "Statement": []}}],
//!  "SetPolicy": ["readonly"]}
//! ```
//!
//! Both lists are optional. A batch is parsed fail-closed: if any statement
//! is malformed, no directives are returned and the error lists every
//! failing statement.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StatementFailure, StatementParseError};
use crate::policy::PolicyDocument;

/// Policy directives carried by one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinioStatement {
    /// Policies to register before binding.
    #[serde(rename = "EnsurePolicy", default, deserialize_with = "null_as_empty")]
    pub ensure_policy: Vec<EnsurePolicy>,

    /// Existing policies to bind as-is.
    #[serde(rename = "SetPolicy", default, deserialize_with = "null_as_empty")]
    pub set_policy: Vec<String>,
}

/// A named policy document to register (upsert) with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsurePolicy {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Policy")]
    pub policy: PolicyDocument,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode every statement, in order.
pub fn parse_statements<S: AsRef<str>>(
    statements: &[S],
) -> Result<Vec<MinioStatement>, StatementParseError> {
    let mut parsed = Vec::with_capacity(statements.len());
    let mut failures = Vec::new();

    for (index, raw) in statements.iter().enumerate() {
        // A bare `null` is an empty directive.
        match serde_json::from_str::<Option<MinioStatement>>(raw.as_ref()) {
            Ok(statement) => parsed.push(statement.unwrap_or_default()),
            Err(e) => failures.push(StatementFailure {
                index,
                message: e.to_string(),
            }),
        }
    }

    if failures.is_empty() {
        Ok(parsed)
    } else {
        Err(StatementParseError { failures })
    }
}
