use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu, ensure};
use url::Url;

#[derive(Debug, Snafu)]
pub enum NodeUrlError {
    #[snafu(display("Invalid node url: {input}"))]
    Parse {
        input: String,
        source: url::ParseError,
    },
    #[snafu(display("Node url must be http(s): {input}"))]
    Scheme { input: String },
}

/// Address of a single JSON-RPC node
///
/// Cheap to clone; compared by its normalized url string.
#[derive(
    Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(try_from = "String", into = "String")]
pub struct NodeUrl(Arc<str>);

impl NodeUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NodeUrl {
    type Err = NodeUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s.trim()).context(ParseSnafu { input: s })?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            SchemeSnafu { input: s }
        );
        Ok(Self(Arc::from(url.as_str())))
    }
}

impl TryFrom<String> for NodeUrl {
    type Error = NodeUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeUrl> for String {
    fn from(value: NodeUrl) -> Self {
        value.0.as_ref().to_owned()
    }
}

impl fmt::Debug for NodeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[test]
fn node_url_normalizes_and_rejects_non_http() {
    let a: NodeUrl = "https://api.hive.blog".parse().expect("valid");
    let b: NodeUrl = " https://api.hive.blog/ ".parse().expect("valid");
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "https://api.hive.blog/");

    assert!("ftp://api.hive.blog".parse::<NodeUrl>().is_err());
    assert!("not a url".parse::<NodeUrl>().is_err());
}
