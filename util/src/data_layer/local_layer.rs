use std::fs::{DirEntry, File};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use errors::*;

use data_layer::abstraction_layer::AbstractionLayer;

/// `LocalAbstractionLayer` handles data interaction on a local file system, rooted at a
/// directory. Relative paths are resolved against the root; absolute paths are used as they are.
pub struct LocalAbstractionLayer {
    root: PathBuf,
}

impl LocalAbstractionLayer {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        LocalAbstractionLayer { root: root.as_ref().to_path_buf() }
    }

    fn absolute_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn abstracted_path(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.root) {
            Ok(relative_path) => relative_path.to_path_buf(),
            Err(_) => path.to_path_buf(),
        }
    }

    fn open_file(&self, path: &Path) -> Result<File> {
        let file_path = self.absolute_path(path);
        debug!("Opening file: {}", file_path.to_string_lossy());
        File::open(&file_path).chain_err(|| format!("unable to open file {:?}", file_path))
    }
}

impl AbstractionLayer for LocalAbstractionLayer {
    fn get_file_length(&self, path: &Path) -> Result<u64> {
        let file_path = self.absolute_path(path);
        debug!("Getting file length: {:?}", file_path);

        let metadata = fs::metadata(&file_path).chain_err(|| {
            format!("Error getting metadata for {:?}", file_path)
        })?;

        Ok(metadata.len())
    }

    fn read_file_location(&self, path: &Path, start_byte: u64, end_byte: u64) -> Result<Vec<u8>> {
        if end_byte < start_byte {
            return Err(
                format!(
                    "Invalid byte range {}..{} for file {:?}",
                    start_byte,
                    end_byte,
                    path
                ).into(),
            );
        }

        let mut file = self.open_file(path)?;
        file.seek(SeekFrom::Start(start_byte)).chain_err(|| {
            format!("Error reading file {:?}", path)
        })?;

        let mut bytes = vec![0; (end_byte - start_byte) as usize];
        file.read_exact(&mut bytes).chain_err(|| {
            format!("Error reading file {:?}", path)
        })?;

        Ok(bytes)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let file_path = self.absolute_path(path);
        debug!("Writing file: {}", file_path.to_string_lossy());

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).chain_err(|| {
                format!("unable to create directory {:?}", parent)
            })?;
        }

        let mut file = File::create(&file_path).chain_err(|| {
            format!("unable to create file {:?}", file_path)
        })?;

        file.write_all(data).chain_err(|| {
            format!("unable to write content to {:?}", file_path)
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let absolute_path = self.absolute_path(path);
        debug!("Reading from {:?}", absolute_path);
        let entries = fs::read_dir(&absolute_path).chain_err(|| {
            format!("Unable to read directory {:?}", absolute_path)
        })?;

        let mut abstracted_entries: Vec<PathBuf> = vec![];
        for entry in entries {
            let entry: DirEntry = entry.chain_err(|| "Error reading directory entry")?;
            abstracted_entries.push(self.abstracted_path(&entry.path()));
        }
        Ok(abstracted_entries)
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.absolute_path(path).exists())
    }

    fn is_file(&self, path: &Path) -> Result<bool> {
        Ok(self.absolute_path(path).is_file())
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(self.absolute_path(path).is_dir())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let absolute_path = self.absolute_path(path);
        debug!("Creating directory: {:?}", absolute_path);
        fs::create_dir_all(&absolute_path).chain_err(|| "Unable to create directories")
    }
}
