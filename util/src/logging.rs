use std::env;

use env_logger::LogBuilder;
use error_chain::ChainedError;

use errors::*;

// Per-task progress is logged at debug. The HTTP stack behind the serverless runtime logs every
// long poll at info, so it only reports warnings by default.
const DEFAULT_LOG_CONFIG: &str = "info,hyper=warn,reqwest=warn";

/// Sets up `env_logger` from `RUST_LOG`, or from a default filter when it is unset.
pub fn init_logger() -> Result<()> {
    let log_config = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_CONFIG.to_owned());

    LogBuilder::new()
        .parse(&log_config)
        .init()
        .chain_err(|| format!("Failed to build env_logger from '{}'", log_config))
}

/// Logs an error, every error that caused it and its backtrace, if one was captured.
pub fn output_error<E: ChainedError>(err: &E) {
    error!("{}", err);

    for (depth, cause) in err.iter().skip(1).enumerate() {
        error!("  {}: caused by: {}", depth + 1, cause);
    }

    if let Some(backtrace) = err.backtrace() {
        error!("backtrace: {:?}", backtrace);
    }
}
