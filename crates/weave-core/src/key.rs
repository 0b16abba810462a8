use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::namespace::ApiNamespace;

/// Deterministic identity of a read, used for both deduplication and caching
///
/// Keys built with [`RequestKey::for_call`] fingerprint the namespace, method
/// and params. Params are canonicalized first, so object key order does not
/// matter.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub struct RequestKey(Arc<str>);

impl RequestKey {
    pub fn for_call(namespace: ApiNamespace, method: &str, params: &Value) -> Self {
        let mut canonical = String::new();
        write_canonical(params, &mut canonical);
        let hash = blake3::hash(canonical.as_bytes());

        Self(Arc::from(format!(
            "{}#{}",
            namespace.wire_method(method),
            data_encoding::BASE32_NOPAD.encode(&hash.as_bytes()[..10])
        )))
    }

    /// A key chosen by the caller, for reads that are not a single call
    pub fn named(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestKey {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

impl fmt::Debug for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("RequestKey({})", self.0))
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
