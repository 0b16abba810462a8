use nodeweave_util_error::WhateverResult;

#[tokio::main]
#[snafu::report]
async fn main() -> WhateverResult<()> {
    nodeweave::run_cli().await
}
