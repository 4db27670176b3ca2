use crate::error::KVError;

/// KVStore is the document backend behind the record store.
///
/// Keys are namespaced by collection: `bugs/{id}`. Values are opaque bytes;
/// callers own the encoding.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Insert or overwrite a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Returns whether the key existed; deleting a missing key
    /// is not an error.
    fn delete(&self, key: &str) -> Result<bool, KVError>;

    /// Read-modify-write a key in one transaction.
    ///
    /// `f` sees the current value and returns the replacement, or `None` to
    /// leave it as is. Returns the value now stored, or `None` (without
    /// calling `f` or writing) when the key does not exist.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(&[u8]) -> Result<Option<Vec<u8>>, KVError>,
    ) -> Result<Option<Vec<u8>>, KVError>;

    /// Scan all keys matching a prefix. Returns (key, value) pairs sorted by key.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
