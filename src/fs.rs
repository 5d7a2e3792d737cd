//! Centralized filesystem operations for better testability.
//!
//! Spec loading, importers and report output all go through the
//! `FileSystem` trait so commands can be exercised against an in-memory
//! filesystem in tests.

use std::io::{self, Write};
use std::path::Path;

/// Trait for filesystem operations, enabling dependency injection and testing.
pub trait FileSystem: Send + Sync {
    /// Read the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write content to a file, creating it if it doesn't exist.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Open a writer for report output.
    fn create_file(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// Real filesystem implementation using std::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_file(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(io::BufWriter::new(std::fs::File::create(path)?)))
    }
}

/// Global default filesystem for use when dependency injection isn't practical.
pub fn default_fs() -> &'static RealFs {
    static INSTANCE: RealFs = RealFs;
    &INSTANCE
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// In-memory filesystem for testing.
    #[derive(Debug, Default)]
    pub struct MockFs {
        files: Arc<RwLock<HashMap<String, String>>>,
    }

    impl MockFs {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populate the mock filesystem with files.
        pub fn with_files<I, P, C>(files: I) -> Self
        where
            I: IntoIterator<Item = (P, C)>,
            P: AsRef<Path>,
            C: Into<String>,
        {
            let map: HashMap<String, String> = files
                .into_iter()
                .map(|(p, c)| (p.as_ref().to_string_lossy().to_string(), c.into()))
                .collect();
            Self {
                files: Arc::new(RwLock::new(map)),
            }
        }

        /// Get all files currently in the mock filesystem.
        pub fn files(&self) -> HashMap<String, String> {
            self.files.read().unwrap().clone()
        }
    }

    /// Buffers writes and stores them in the mock filesystem on drop.
    struct MockWriter {
        key: String,
        buffer: Vec<u8>,
        files: Arc<RwLock<HashMap<String, String>>>,
    }

    impl Write for MockWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            let content = String::from_utf8_lossy(&self.buffer).to_string();
            self.files.write().unwrap().insert(self.key.clone(), content);
            Ok(())
        }
    }

    impl Drop for MockWriter {
        fn drop(&mut self) {
            let _ = self.flush();
        }
    }

    impl FileSystem for MockFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            let key = path.to_string_lossy().to_string();
            self.files
                .read()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("file not found: {}", key))
                })
        }

        fn write(&self, path: &Path, content: &str) -> io::Result<()> {
            let key = path.to_string_lossy().to_string();
            self.files.write().unwrap().insert(key, content.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            let key = path.to_string_lossy().to_string();
            self.files.read().unwrap().contains_key(&key)
        }

        fn create_file(&self, path: &Path) -> io::Result<Box<dyn Write>> {
            Ok(Box::new(MockWriter {
                key: path.to_string_lossy().to_string(),
                buffer: Vec::new(),
                files: Arc::clone(&self.files),
            }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mock_fs_read_write() {
            let fs = MockFs::new();
            let path = Path::new("/test/spec.yaml");

            assert!(!fs.exists(path));
            assert!(fs.read_to_string(path).is_err());

            fs.write(path, "name: demo").unwrap();
            assert!(fs.exists(path));
            assert_eq!(fs.read_to_string(path).unwrap(), "name: demo");
        }

        #[test]
        fn test_mock_fs_create_file_persists_on_drop() {
            let fs = MockFs::new();
            {
                let mut writer = fs.create_file(Path::new("/out/report.md")).unwrap();
                write!(writer, "# Report").unwrap();
            }
            assert_eq!(fs.files()["/out/report.md"], "# Report");
        }

        #[test]
        fn test_mock_fs_with_files() {
            let fs = MockFs::with_files([
                (Path::new("/a.yaml"), "content a"),
                (Path::new("/b.json"), "content b"),
            ]);

            assert_eq!(fs.read_to_string(Path::new("/a.yaml")).unwrap(), "content a");
            assert_eq!(fs.read_to_string(Path::new("/b.json")).unwrap(), "content b");
        }
    }
}
