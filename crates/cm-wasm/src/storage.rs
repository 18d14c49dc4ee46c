//! `window.localStorage` as a blob store.
//!
//! Blobs are stored as UTF-8 strings, so only the JSON codec is usable here.

use cm_core::persist::{BlobStore, PersistError};
use web_sys::Storage;

pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    /// The page's local storage, if the browser exposes one.
    pub fn open() -> Result<Self, PersistError> {
        let window =
            web_sys::window().ok_or_else(|| PersistError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| PersistError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| PersistError::Unavailable("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl BlobStore for LocalStorage {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        self.storage
            .get_item(key)
            .map(|item| item.map(String::into_bytes))
            .map_err(|e| PersistError::Unavailable(format!("{e:?}")))
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| PersistError::Encode(format!("blob is not UTF-8: {e}")))?;
        // Quota errors surface here as a DOMException.
        self.storage
            .set_item(key, text)
            .map_err(|e| PersistError::Write(format!("{e:?}")))
    }
}
