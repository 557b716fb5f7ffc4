use std::{
    io,
    path::{Path, PathBuf},
};

mod equipment;
pub use equipment::{load_equipment, read_equipment_csv, read_equipment_json};

/// Reading and writing WBS trees.
pub mod tree;
pub use tree::{load_tree, save_tree_csv, save_tree_json, write_csv, FlatRow};

/// Errors that can occur when reading or writing files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file is not valid JSON of the expected shape.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// The file is not valid CSV of the expected shape.
    #[error("invalid CSV in {}: {source}", path.display())]
    Csv {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: csv::Error,
    },

    /// The file extension is not one of `json` or `csv`.
    #[error("unsupported file type: {}", path.display())]
    UnsupportedFormat {
        /// The file.
        path: PathBuf,
    },
}

/// File formats understood by the loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

impl Format {
    fn of(path: &Path) -> Result<Self, StorageError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(StorageError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn open(path: &Path) -> Result<io::BufReader<std::fs::File>, StorageError> {
    std::fs::File::open(path)
        .map(io::BufReader::new)
        .map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn create(path: &Path) -> Result<io::BufWriter<std::fs::File>, StorageError> {
    let write_error = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::File::create(path)
        .map(io::BufWriter::new)
        .map_err(write_error)
}
