use std::path::{Path, PathBuf};

use errors::*;

/// `AbstractionLayer` is the storage contract used by every map and reduce task.
///
/// Paths are relative to the location the layer was created for. Implementations must allow
/// concurrent writers to distinct paths and concurrent readers of a file that has been fully
/// written.
pub trait AbstractionLayer {
    fn get_file_length(&self, path: &Path) -> Result<u64>;

    /// Reads the bytes in `[start_byte, end_byte)` of the file at `path`.
    fn read_file_location(&self, path: &Path, start_byte: u64, end_byte: u64) -> Result<Vec<u8>>;

    /// Writes `data` to `path`, replacing any existing file and creating parent directories.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> Result<bool>;

    fn is_file(&self, path: &Path) -> Result<bool>;

    fn is_dir(&self, path: &Path) -> Result<bool>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;
}
