use nodeweave_cache::DegradationError;
use nodeweave_health::HealthInitError;
use nodeweave_rpc::transport::TransportInitError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WeaveInitError {
    #[snafu(transparent)]
    Health { source: HealthInitError },
    #[snafu(transparent)]
    Transport { source: TransportInitError },
}

#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RcError {
    #[snafu(transparent)]
    Read { source: DegradationError },
    #[snafu(display("No resource credit account {account}"))]
    AccountNotFound { account: String },
}

impl RcError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RcError::Read { source } => source.is_retryable(),
            RcError::AccountNotFound { .. } => false,
        }
    }
}
