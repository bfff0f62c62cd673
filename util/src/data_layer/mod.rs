use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use errors::*;

mod abstraction_layer;
mod local_layer;
#[cfg(feature = "s3")]
mod s3_layer;

pub use self::abstraction_layer::AbstractionLayer;
pub use self::local_layer::LocalAbstractionLayer;
#[cfg(feature = "s3")]
pub use self::s3_layer::AmazonS3AbstractionLayer;

pub type AbstractionLayerArc = Arc<dyn AbstractionLayer + Send + Sync>;

/// The kinds of backing store a job can run against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileSystemType {
    Local,
    S3,
}

impl Default for FileSystemType {
    fn default() -> Self {
        FileSystemType::Local
    }
}

impl fmt::Display for FileSystemType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FileSystemType::Local => write!(f, "local"),
            FileSystemType::S3 => write!(f, "s3"),
        }
    }
}

impl FromStr for FileSystemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(FileSystemType::Local),
            "s3" => Ok(FileSystemType::S3),
            _ => Err(format!("Unknown file system type '{}'", s).into()),
        }
    }
}

/// `init_data_layer` resolves a backing store handle for the given type and location.
///
/// For `Local` the location is a directory. For `S3` it is `bucket` or `bucket/prefix`, with an
/// optional `s3://` scheme.
pub fn init_data_layer(fs_type: FileSystemType, location: &str) -> Result<AbstractionLayerArc> {
    info!("Initialising {} data layer at {}", fs_type, location);
    match fs_type {
        FileSystemType::Local => Ok(Arc::new(LocalAbstractionLayer::new(location))),
        FileSystemType::S3 => init_s3_data_layer(location),
    }
}

#[cfg(feature = "s3")]
fn init_s3_data_layer(location: &str) -> Result<AbstractionLayerArc> {
    let layer = AmazonS3AbstractionLayer::from_location(location)
        .chain_err(|| format!("Unable to connect to S3 location {}", location))?;
    Ok(Arc::new(layer))
}

#[cfg(not(feature = "s3"))]
fn init_s3_data_layer(location: &str) -> Result<AbstractionLayerArc> {
    Err(
        format!(
            "Cannot use S3 location {}: util was built without the `s3` feature",
            location
        ).into(),
    )
}
