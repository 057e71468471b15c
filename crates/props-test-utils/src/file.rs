//! [`PropsFile`] fixture for property store tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A properties file inside a temporary directory that lives as long as
/// the fixture.
///
/// # Example
///
/// ```rust,no_run
/// use props_test_utils::PropsFile;
///
/// let file = PropsFile::with_contents("server.port=8080\n");
/// assert!(file.contains_line("server.port=8080"));
/// ```
pub struct PropsFile {
    temp_dir: TempDir,
    path: PathBuf,
}

impl Default for PropsFile {
    fn default() -> Self {
        Self::new()
    }
}

impl PropsFile {
    /// File name used inside the temp directory.
    pub const FILE_NAME: &'static str = "app.properties";

    /// Create the directory and an empty properties file.
    pub fn new() -> Self {
        Self::with_contents("")
    }

    /// Create the directory and a properties file holding `contents`.
    pub fn with_contents(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("PropsFile: failed to create temp dir");
        let path = temp_dir.path().join(Self::FILE_NAME);
        fs::write(&path, contents).expect("PropsFile: failed to write properties file");
        Self { temp_dir, path }
    }

    /// Path of the properties file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the properties file as a string, for use as a property value.
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Root of the temporary directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Overwrite the file, simulating an edit made outside the store.
    pub fn write(&self, contents: &str) {
        fs::write(&self.path, contents).expect("PropsFile::write: failed to write");
    }

    /// Current contents of the file.
    pub fn read(&self) -> String {
        fs::read_to_string(&self.path).expect("PropsFile::read: failed to read")
    }

    /// Delete the file, leaving the directory in place.
    pub fn remove(&self) {
        fs::remove_file(&self.path).expect("PropsFile::remove: failed to delete");
    }

    /// Whether any line of the file equals `line` exactly.
    pub fn contains_line(&self, line: &str) -> bool {
        self.read().lines().any(|l| l == line)
    }

    /// Replace the file with a directory of the same name so the next
    /// write through a store fails, regardless of process privileges.
    pub fn block_writes(&self) {
        if self.path.is_file() {
            self.remove();
        }
        fs::create_dir(&self.path).expect("PropsFile::block_writes: failed to create dir");
    }

    /// Undo [`PropsFile::block_writes`], leaving no file behind.
    pub fn unblock_writes(&self) {
        fs::remove_dir_all(&self.path).expect("PropsFile::unblock_writes: failed to remove dir");
    }
}
