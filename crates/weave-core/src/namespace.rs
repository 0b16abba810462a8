use std::fmt;
use std::str::FromStr;

use snafu::Snafu;

/// JSON-RPC API namespace a method lives in
///
/// Nodes expect the wire method name as `<namespace>.<method>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiNamespace {
    /// Account, content and social calls, array-style params
    Condenser,
    /// Resource credit calls, object-style params
    Rc,
    Database,
    Bridge,
    Block,
}

impl ApiNamespace {
    pub const fn as_str(self) -> &'static str {
        match self {
            ApiNamespace::Condenser => "condenser_api",
            ApiNamespace::Rc => "rc_api",
            ApiNamespace::Database => "database_api",
            ApiNamespace::Bridge => "bridge",
            ApiNamespace::Block => "block_api",
        }
    }

    /// Full wire method name, e.g. `condenser_api.get_accounts`
    pub fn wire_method(self, method: &str) -> String {
        format!("{}.{method}", self.as_str())
    }
}

impl fmt::Display for ApiNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unknown API namespace: {namespace}"))]
pub struct UnknownNamespaceError {
    namespace: String,
}

impl FromStr for ApiNamespace {
    type Err = UnknownNamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "condenser_api" => ApiNamespace::Condenser,
            "rc_api" => ApiNamespace::Rc,
            "database_api" => ApiNamespace::Database,
            "bridge" => ApiNamespace::Bridge,
            "block_api" => ApiNamespace::Block,
            _ => {
                return UnknownNamespaceSnafu {
                    namespace: s.to_owned(),
                }
                .fail();
            }
        })
    }
}

#[test]
fn namespace_round_trips_through_str() {
    for ns in [
        ApiNamespace::Condenser,
        ApiNamespace::Rc,
        ApiNamespace::Database,
        ApiNamespace::Bridge,
        ApiNamespace::Block,
    ] {
        assert_eq!(ns.as_str().parse::<ApiNamespace>().ok(), Some(ns));
    }
    assert!("nope_api".parse::<ApiNamespace>().is_err());
    assert_eq!(
        ApiNamespace::Rc.wire_method("find_rc_accounts"),
        "rc_api.find_rc_accounts"
    );
}
