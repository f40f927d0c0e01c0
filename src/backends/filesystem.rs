//! Filesystem storage adapter.
//!
//! Keys are slash-delimited paths relative to a root directory. Blocking
//! filesystem calls run on tokio's blocking pool.
//!
//! Writes are not transactional: parent directories created for a write stay
//! in place even if the file write then fails, and a crash mid-write can leave
//! a truncated file behind.

use async_trait::async_trait;
use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{Result, StorageError};
use crate::options::Options;
use crate::storage::{Lister, Reader, Remover, Writer};

/// Filesystem-backed object storage.
///
/// `FilesystemStorage` is `Clone` and cheap to share; it holds only the root
/// path. Concurrent writes to different keys are safe. Concurrent writes to
/// the same key are last-writer-wins.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
    file_mode: u32,
    dir_mode: u32,
}

impl FilesystemStorage {
    /// Creates a store rooted at `root` using the default permission bits.
    ///
    /// The root directory is not created here; the first write creates it.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_modes(root, constants::DEFAULT_FILE_MODE, constants::DEFAULT_DIR_MODE)
    }

    /// Creates a store with explicit default permission bits, used whenever a
    /// write's options leave `mode` or `dir_mode` at zero.
    pub fn with_modes<P: AsRef<Path>>(root: P, file_mode: u32, dir_mode: u32) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            file_mode,
            dir_mode,
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key onto its file path: `root/key`.
    ///
    /// Plain concatenation, so a key with a leading `/` still lands under
    /// the root instead of replacing it the way `Path::join` would.
    fn file_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone().into_os_string();
        path.push("/");
        path.push(key);
        PathBuf::from(path)
    }

    fn write_sync(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        let path = self.file_path(key);
        let (file_mode, dir_mode) = self.modes(options);

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            create_dir_all(parent, dir_mode)
                .map_err(|e| StorageError::io(format!("create parent directories for {key}"), e))?;
        }

        let mut file = open_truncate(&path, file_mode)
            .map_err(|e| StorageError::io(format!("open {key}"), e))?;
        file.write_all(body)
            .map_err(|e| StorageError::io(format!("write {key}"), e))?;

        tracing::debug!(key, bytes = body.len(), "Wrote object to filesystem");
        Ok(())
    }

    fn read_sync(&self, key: &str) -> Result<Vec<u8>> {
        match fs::read(self.file_path(key)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(StorageError::io(format!("read {key}"), e)),
        }
    }

    fn remove_sync(&self, key: &str) -> Result<()> {
        fs::remove_file(self.file_path(key))
            .map_err(|e| StorageError::io(format!("remove {key}"), e))?;

        tracing::debug!(key, "Removed object from filesystem");
        Ok(())
    }

    fn keys_sync(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.file_path(prefix);
        let entries =
            fs::read_dir(&dir).map_err(|e| StorageError::io(format!("list {prefix}"), e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(format!("list {prefix}"), e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::io(format!("list {prefix}"), e))?;

            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name();
            keys.push(child_key(prefix, &name.to_string_lossy()));
        }

        Ok(keys)
    }

    fn modes(&self, options: Option<&Options>) -> (u32, u32) {
        let or_default = |value: u32, default: u32| if value == 0 { default } else { value };

        match options {
            Some(options) => (
                or_default(options.mode, self.file_mode),
                or_default(options.dir_mode, self.dir_mode),
            ),
            None => (self.file_mode, self.dir_mode),
        }
    }
}

/// Builds the root-relative key for a file found directly inside `prefix`.
fn child_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches(constants::KEY_SEPARATOR);
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{}{name}", constants::KEY_SEPARATOR)
    }
}

#[cfg(unix)]
fn create_dir_all(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(mode).create(path)
}

#[cfg(not(unix))]
fn create_dir_all(path: &Path, _mode: u32) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn open_truncate(path: &Path, mode: u32) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn open_truncate(path: &Path, _mode: u32) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::backend("filesystem task join", e))?
}

#[async_trait]
impl Reader for FilesystemStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let store = self.clone();
        let key = key.to_string();
        blocking(move || store.read_sync(&key)).await
    }
}

#[async_trait]
impl Writer for FilesystemStorage {
    async fn write(&self, key: &str, body: &[u8], options: Option<&Options>) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        let body = body.to_vec();
        let options = options.copied();
        blocking(move || store.write_sync(&key, &body, options.as_ref())).await
    }
}

/// Removing an absent key surfaces the filesystem's own error as
/// `StorageError::Io`; it is not mapped to `NotFound`.
#[async_trait]
impl Remover for FilesystemStorage {
    async fn remove(&self, key: &str) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        blocking(move || store.remove_sync(&key)).await
    }
}

/// Lists regular files directly inside the prefix directory. Subdirectories
/// are skipped, not recursed into.
#[async_trait]
impl Lister for FilesystemStorage {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let store = self.clone();
        let prefix = prefix.to_string();
        blocking(move || store.keys_sync(&prefix)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_storage() -> (FilesystemStorage, TempDir) {
        let tmp = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(tmp.path());
        (storage, tmp)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (storage, _tmp) = create_storage();

        storage.write("test.txt", b"Hello, World!", None).await.unwrap();

        let data = storage.read("test.txt").await.unwrap();
        assert_eq!(data, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let (storage, _tmp) = create_storage();

        let err = storage.read("nonexistent.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_nested_write_creates_directories() {
        let (storage, tmp) = create_storage();

        storage.write("a/b/c/d/file.txt", b"nested", None).await.unwrap();

        assert!(tmp.path().join("a/b/c/d").is_dir());
        assert_eq!(storage.read("a/b/c/d/file.txt").await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn test_overwrite_truncates() {
        let (storage, _tmp) = create_storage();

        storage.write("test.txt", b"original content", None).await.unwrap();
        storage.write("test.txt", b"short", None).await.unwrap();

        assert_eq!(storage.read("test.txt").await.unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_remove_only_target() {
        let (storage, tmp) = create_storage();

        storage.write("dir/a.txt", b"a", None).await.unwrap();
        storage.write("dir/b.txt", b"b", None).await.unwrap();

        storage.remove("dir/a.txt").await.unwrap();

        assert!(storage.read("dir/a.txt").await.unwrap_err().is_not_found());
        assert_eq!(storage.read("dir/b.txt").await.unwrap(), b"b");
        assert!(tmp.path().join("dir").is_dir());
    }

    #[tokio::test]
    async fn test_remove_nonexistent_surfaces_io_error() {
        let (storage, _tmp) = create_storage();

        let err = storage.remove("missing.txt").await.unwrap_err();
        match err {
            StorageError::Io { source, .. } => assert_eq!(source.kind(), ErrorKind::NotFound),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keys_skips_directories() {
        let (storage, _tmp) = create_storage();

        storage.write("images/logo.png", b"png", None).await.unwrap();
        storage.write("images/banner.jpg", b"jpg", None).await.unwrap();
        storage.write("images/thumbs/small.png", b"small", None).await.unwrap();

        let mut keys = storage.keys("images").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["images/banner.jpg", "images/logo.png"]);
    }

    #[tokio::test]
    async fn test_keys_at_root() {
        let (storage, _tmp) = create_storage();

        storage.write("top.txt", b"top", None).await.unwrap();
        storage.write("nested/inner.txt", b"inner", None).await.unwrap();

        assert_eq!(storage.keys("").await.unwrap(), vec!["top.txt"]);
    }

    #[tokio::test]
    async fn test_keys_missing_directory_is_error() {
        let (storage, _tmp) = create_storage();

        let err = storage.keys("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn test_all() {
        let (storage, _tmp) = create_storage();

        storage.write("docs/readme.md", b"md", None).await.unwrap();
        storage.write("docs/guide.md", b"guide", None).await.unwrap();

        let mut objects = storage.all("docs/").await.unwrap();
        objects.sort();
        assert_eq!(objects, vec![b"guide".to_vec(), b"md".to_vec()]);
    }

    #[test]
    fn test_child_key() {
        assert_eq!(child_key("", "a.txt"), "a.txt");
        assert_eq!(child_key("docs", "a.txt"), "docs/a.txt");
        assert_eq!(child_key("docs/", "a.txt"), "docs/a.txt");
    }

    #[test]
    fn test_zero_modes_fall_back_to_defaults() {
        let storage = FilesystemStorage::with_modes("/tmp", 0o640, 0o700);

        assert_eq!(storage.modes(None), (0o640, 0o700));
        assert_eq!(storage.modes(Some(&Options::default())), (0o640, 0o700));
        assert_eq!(
            storage.modes(Some(&Options::default().with_mode(0o644))),
            (0o644, 0o700)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_bits_applied() {
        use std::os::unix::fs::PermissionsExt;

        let (storage, tmp) = create_storage();
        let options = Options::default().with_mode(0o600).with_dir_mode(0o700);

        storage.write("secret/key.pem", b"pem", Some(&options)).await.unwrap();

        let file_mode = fs::metadata(tmp.path().join("secret/key.pem"))
            .unwrap()
            .permissions()
            .mode();
        let dir_mode = fs::metadata(tmp.path().join("secret"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
