//! Blob store client: places content under `{env}/{content_key}`.
//!
//! Uploads are idempotent: writing the same key twice leaves the same bytes
//! in place. By default every blob is uploaded; `check_existing` adds a
//! `HEAD` check that skips the transfer when the key is already present.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use exodus_core::{error::io_err, ContentKey, EnvName};

use crate::error::SyncError;
use crate::gateway::{map_error, HttpGateway};

/// Storage operations needed by [`BlobUploader`].
pub trait BlobStore {
    /// Whether a blob is already stored at `key`.
    fn exists(&self, env: &EnvName, key: &ContentKey) -> Result<bool, SyncError>;

    /// Store `len` bytes from `reader` at `key`, replacing anything there.
    fn put(
        &self,
        env: &EnvName,
        key: &ContentKey,
        reader: &mut dyn Read,
        len: u64,
    ) -> Result<(), SyncError>;
}

impl<B: BlobStore + ?Sized> BlobStore for &B {
    fn exists(&self, env: &EnvName, key: &ContentKey) -> Result<bool, SyncError> {
        (**self).exists(env, key)
    }

    fn put(
        &self,
        env: &EnvName,
        key: &ContentKey,
        reader: &mut dyn Read,
        len: u64,
    ) -> Result<(), SyncError> {
        (**self).put(env, key, reader, len)
    }
}

/// Outcome of [`BlobUploader::ensure_uploaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Bytes were transferred.
    Uploaded,
    /// The existence check found the key; nothing was transferred.
    AlreadyPresent,
}

/// Makes sure a blob exists for a content key.
#[derive(Debug)]
pub struct BlobUploader<B> {
    store: B,
    check_existing: bool,
}

impl<B: BlobStore> BlobUploader<B> {
    pub fn new(store: B, check_existing: bool) -> Self {
        Self {
            store,
            check_existing,
        }
    }

    /// Upload the file at `source` under `key` unless the existence check (when
    /// enabled) says it is already there. Errors are not retried.
    pub fn ensure_uploaded(
        &self,
        env: &EnvName,
        key: &ContentKey,
        source: &Path,
    ) -> Result<UploadOutcome, SyncError> {
        if self.check_existing && self.store.exists(env, key)? {
            tracing::debug!(key = %key, "blob already present");
            return Ok(UploadOutcome::AlreadyPresent);
        }

        let mut file = File::open(source).map_err(|e| io_err(source, e))?;
        let len = file.metadata().map_err(|e| io_err(source, e))?.len();
        self.store.put(env, key, &mut file, len)?;
        tracing::info!(path = %source.display(), key = %key, bytes = len, "uploaded");
        Ok(UploadOutcome::Uploaded)
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

impl HttpGateway {
    fn blob_url(&self, env: &EnvName, key: &ContentKey) -> String {
        format!("{}/{env}/{key}", self.upload_url)
    }
}

impl BlobStore for HttpGateway {
    fn exists(&self, env: &EnvName, key: &ContentKey) -> Result<bool, SyncError> {
        let url = self.blob_url(env, key);
        match self.agent.head(&url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(err) => Err(map_error(&url, err)),
        }
    }

    fn put(
        &self,
        env: &EnvName,
        key: &ContentKey,
        reader: &mut dyn Read,
        len: u64,
    ) -> Result<(), SyncError> {
        let url = self.blob_url(env, key);
        tracing::debug!(%url, "PUT");
        self.agent
            .put(&url)
            .set("Content-Type", "application/octet-stream")
            .set("Content-Length", &len.to_string())
            .send(reader)
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryStore {
        blobs: RefCell<HashMap<String, Vec<u8>>>,
        puts: RefCell<usize>,
        checks: RefCell<usize>,
    }

    impl BlobStore for MemoryStore {
        fn exists(&self, env: &EnvName, key: &ContentKey) -> Result<bool, SyncError> {
            *self.checks.borrow_mut() += 1;
            Ok(self.blobs.borrow().contains_key(&format!("{env}/{key}")))
        }

        fn put(
            &self,
            env: &EnvName,
            key: &ContentKey,
            reader: &mut dyn Read,
            _len: u64,
        ) -> Result<(), SyncError> {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).unwrap();
            *self.puts.borrow_mut() += 1;
            self.blobs.borrow_mut().insert(format!("{env}/{key}"), bytes);
            Ok(())
        }
    }

    fn hello_file() -> (TempDir, std::path::PathBuf, ContentKey) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.txt");
        std::fs::write(&path, "hello").unwrap();
        let key = exodus_core::digest::digest_file(&path).unwrap();
        (tmp, path, key)
    }

    #[test]
    fn uploading_twice_leaves_the_same_state() {
        let (_tmp, path, key) = hello_file();
        let env = EnvName::from("live");
        let store = MemoryStore::default();
        let uploader = BlobUploader::new(&store, false);

        assert_eq!(
            uploader.ensure_uploaded(&env, &key, &path).unwrap(),
            UploadOutcome::Uploaded
        );
        let after_once = store.blobs.borrow().clone();
        uploader.ensure_uploaded(&env, &key, &path).unwrap();

        assert_eq!(*store.blobs.borrow(), after_once);
        assert_eq!(*store.puts.borrow(), 2, "default mode always re-uploads");
        assert_eq!(*store.checks.borrow(), 0);
        assert_eq!(
            store.blobs.borrow().get(&format!("live/{key}")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn existence_check_skips_transfer() {
        let (_tmp, path, key) = hello_file();
        let env = EnvName::from("live");
        let store = MemoryStore::default();
        let uploader = BlobUploader::new(&store, true);

        uploader.ensure_uploaded(&env, &key, &path).unwrap();
        assert_eq!(
            uploader.ensure_uploaded(&env, &key, &path).unwrap(),
            UploadOutcome::AlreadyPresent
        );
        assert_eq!(*store.puts.borrow(), 1);
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let key = ContentKey::parse(&"0".repeat(64)).unwrap();
        let store = MemoryStore::default();
        let err = BlobUploader::new(&store, false)
            .ensure_uploaded(&EnvName::from("live"), &key, &tmp.path().join("gone"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Core(_)));
        assert_eq!(*store.puts.borrow(), 0);
    }
}
