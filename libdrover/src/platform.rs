use std::env;

/// Environment variables the Lambda host sets for every function process.
pub const SERVERLESS_ENV_VARS: [&str; 3] =
    ["LAMBDA_TASK_ROOT", "AWS_EXECUTION_ENV", "LAMBDA_RUNTIME_DIR"];

/// The way a `Driver` runs its job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run both phases in-process and return.
    Local,
    /// Hand control to a host runtime that invokes one unit of work at a time.
    Serverless,
}

/// `PlatformDetector` decides which `ExecutionMode` the current process should use.
pub trait PlatformDetector {
    fn execution_mode(&self) -> ExecutionMode;
}

/// `EnvironmentDetector` selects `Serverless` only when every variable in
/// `SERVERLESS_ENV_VARS` is set and non-empty in the process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvironmentDetector;

impl PlatformDetector for EnvironmentDetector {
    fn execution_mode(&self) -> ExecutionMode {
        if detect_serverless_context() {
            ExecutionMode::Serverless
        } else {
            ExecutionMode::Local
        }
    }
}

/// Returns true if the process environment describes a serverless function.
pub fn detect_serverless_context() -> bool {
    running_in_serverless_context(|name| env::var(name).ok())
}

/// Returns true only if `lookup` finds a non-empty value for every serverless variable. A
/// partially configured environment counts as local.
pub fn running_in_serverless_context<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    SERVERLESS_ENV_VARS.iter().all(|name| match lookup(name) {
        Some(value) => !value.is_empty(),
        None => false,
    })
}
