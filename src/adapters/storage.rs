use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem storage. Input tables are addressed by caller-given paths
/// (unrooted); outputs are rooted under the run's output directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    /// Paths are used exactly as given.
    pub fn unrooted() -> Self {
        Self {
            base_path: String::new(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if self.base_path.is_empty() {
            PathBuf::from(path)
        } else {
            Path::new(&self.base_path).join(path)
        }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}
