#![recursion_limit = "1024"]

extern crate clap;
#[macro_use]
extern crate error_chain;
extern crate futures;
extern crate futures_cpupool;
#[macro_use]
extern crate log;
extern crate reqwest;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate util;

#[cfg(test)]
extern crate tempfile;

pub mod errors {
    error_chain! {
        links {
            Util(::util::errors::Error, ::util::errors::ErrorKind);
        }

        foreign_links {
            Io(::std::io::Error);
            Json(::serde_json::Error);
            Http(::reqwest::Error);
        }

        errors {
            SourceUnavailable(input: String) {
                description("input source unavailable")
                display("input source '{}' could not be sized or opened", input)
            }
            TaskFailure(task: String) {
                description("task failed")
                display("{} failed", task)
            }
            ConfigurationError(reason: String) {
                description("invalid configuration")
                display("invalid configuration: {}", reason)
            }
        }
    }
}

pub mod cli;
pub mod config;
pub mod driver;
pub mod emitter;
pub mod executor;
pub mod intermediate;
pub mod io;
pub mod job;
pub mod mapper;
pub mod partition;
pub mod platform;
pub mod reducer;
pub mod registry;
pub mod serverless;
pub mod split;

// Commonly used types and functions, re-exported so a job only needs `use drover::*`.
pub use errors::*;
pub use cli::{config_from_matches, parse_command_line};
pub use config::{Config, ConfigBuilder};
pub use driver::Driver;
pub use emitter::{EmitFinal, EmitIntermediate};
pub use intermediate::IntermediateInputKV;
pub use io::MapInputKV;
pub use job::{Job, MapReduceJob};
pub use mapper::Map;
pub use partition::{HashPartitioner, Partition, PartitionInputKV};
pub use platform::{detect_serverless_context, EnvironmentDetector, ExecutionMode,
                   PlatformDetector};
pub use reducer::Reduce;
pub use registry::{UserImplRegistry, UserImplRegistryBuilder};
pub use serverless::{HostRuntime, InvocationHandler, InvocationHandling, LambdaRuntime, TaskRequest,
                     TaskResponse};
pub use split::{compute_splits, pack_splits, InputBin, InputSplit};
pub use util::data_layer::FileSystemType;
pub use util::init_logger;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
