use std::io;
use std::path::PathBuf;

/// Read access to codebase files by root-relative path
pub trait FileSource: Send + Sync {
    fn read(&self, rel_path: &str) -> io::Result<String>;
}

/// Files under a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DirectoryFiles {
    root: PathBuf,
}

impl DirectoryFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileSource for DirectoryFiles {
    fn read(&self, rel_path: &str) -> io::Result<String> {
        let path = self.root.join(rel_path.trim_start_matches("./"));
        log::trace!("Reading {}", path.display());
        std::fs::read_to_string(path)
    }
}

impl<T: FileSource + ?Sized> FileSource for std::sync::Arc<T> {
    fn read(&self, rel_path: &str) -> io::Result<String> {
        (**self).read(rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_files() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(temp.path().join("pkg")).unwrap();
        std::fs::write(temp.path().join("pkg/b.go"), "package pkg\n").unwrap();

        let files = DirectoryFiles::new(temp.path());
        assert_eq!(files.read("pkg/b.go").unwrap(), "package pkg\n");
        assert_eq!(files.read("./pkg/b.go").unwrap(), "package pkg\n");
        assert_eq!(
            files.read("missing.go").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
