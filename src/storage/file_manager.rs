//! # Database Folder Management
//!
//! Every table is a family of flat files in one directory:
//!
//! ```text
//! dbfolder/
//! ├── users.def      # UTF-8 JSON schema document
//! ├── users.rpt      # record-pointer file, 9 bytes per record
//! ├── users.dat      # fixed-width record images
//! ├── idx_name.idx   # one B-tree file per declared index
//! └── idx_email.idx
//! ```
//!
//! `FileManager` owns the folder path and hands out `BlockFile` handles.
//! It never caches handles; each open table holds its own.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};

use super::block::BlockFile;

pub const DEFAULT_DB_FOLDER: &str = "./dbfolder";

pub const DEF_FILE_EXTENSION: &str = ".def";
pub const POINTER_FILE_EXTENSION: &str = ".rpt";
pub const DATA_FILE_EXTENSION: &str = ".dat";
pub const INDEX_FILE_EXTENSION: &str = ".idx";

#[derive(Debug, Clone)]
pub struct FileManager {
    base_path: PathBuf,
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new(DEFAULT_DB_FOLDER)
    }
}

impl FileManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn full_path(&self, file_name: &str) -> PathBuf {
        self.base_path.join(file_name)
    }

    pub fn create_folder_if_absent(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).wrap_err_with(|| {
            format!(
                "failed to create database directory '{}'",
                self.base_path.display()
            )
        })
    }

    /// Creates an empty file (and the folder) unless it already exists.
    /// Returns true when the file was newly created.
    pub fn create_blank_if_absent(&self, file_name: &str) -> Result<bool> {
        let path = self.full_path(file_name);
        if path.exists() {
            return Ok(false);
        }

        self.create_folder_if_absent()?;
        fs::File::create(&path)
            .wrap_err_with(|| format!("failed to create '{}'", path.display()))?;
        Ok(true)
    }

    /// Creates the file, truncating any existing content.
    pub fn create_blank_truncate(&self, file_name: &str) -> Result<()> {
        self.create_folder_if_absent()?;
        let path = self.full_path(file_name);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to create '{}'", path.display()))?;
        Ok(())
    }

    pub fn open_read_write(&self, file_name: &str) -> Result<BlockFile> {
        let path = self.full_path(file_name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to open '{}'", path.display()))?;
        Ok(BlockFile::new(file, path))
    }
}
