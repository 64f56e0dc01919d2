//! Cache keys: a namespace plus canonicalised call arguments.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Named arguments of a memoized call.
///
/// Arguments are kept sorted by name and rendered as compact JSON, so the
/// same logical call always yields the same key regardless of the order in
/// which arguments were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheArgs {
    args: BTreeMap<String, Value>,
}

impl CacheArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Add an argument unless it equals its default.
    ///
    /// A call passing a parameter at its default value must hit the same
    /// entry as a call omitting it.
    pub fn with_default(self, name: impl Into<String>, value: impl Into<Value>, default: impl Into<Value>) -> Self {
        let value = value.into();
        if value == default.into() {
            self
        } else {
            self.arg(name, value)
        }
    }

    /// Deterministic JSON rendering, e.g. `{"end":"2000-01-01","start":"1990-01-01"}`.
    pub fn canonical(&self) -> String {
        let object: serde_json::Map<String, Value> =
            self.args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Value::Object(object).to_string()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Fully qualified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub args: String,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>, args: &CacheArgs) -> Self {
        Self {
            namespace: namespace.into(),
            args: args.canonical(),
        }
    }

    /// Lowercase hex SHA-256 of the rendered key, used as a file name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.args)
    }
}
