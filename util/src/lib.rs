extern crate env_logger;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

#[cfg(feature = "s3")]
extern crate futures;
#[cfg(feature = "s3")]
extern crate rusoto_core;
#[cfg(feature = "s3")]
extern crate rusoto_s3;

#[cfg(test)]
extern crate tempfile;

pub mod errors {
    error_chain!{}
}

pub mod data_layer;
pub mod logging;

pub use logging::init_logger;
pub use logging::output_error;
