//! Declarative field predicates: `data.win.eventInfo.resource=alice@mail.com`.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Exact-match check on a nested field.
/// `path` is the ordered list of object keys to walk; `expected` is a JSON scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub path: Vec<String>,
    pub expected: Value,
}

impl FieldPredicate {
    pub fn new<I, S>(path: I, expected: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { path: path.into_iter().map(Into::into).collect(), expected: expected.into() }
    }
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path.join("."), self.expected)
    }
}

/// Parses `PATH=VALUE`.
///
/// PATH is dot-separated. VALUE is read as a JSON scalar when it is one (`5`, `true`,
/// `null`, `"5"`), otherwise taken verbatim as a string, so `level=5` compares against the
/// number 5 and `level="5"` against the string "5".
impl FromStr for FieldPredicate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (path, raw) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("field filter {:?} must look like PATH=VALUE", s))?;
        let path: Vec<String> = path.trim().split('.').map(|k| k.to_string()).collect();
        if path.iter().any(|k| k.is_empty()) {
            bail!("field filter {:?} has an empty path segment", s);
        }
        let expected = match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
            Ok(_) => bail!("field filter {:?}: expected value must be a scalar", s),
            Err(_) => Value::String(raw.to_string()),
        };
        Ok(Self { path, expected })
    }
}
