use crate::error::{Error, Result};
use std::path::Path;

/// The bucket operations the pipeline needs. Calls block until the remote side answers.
pub trait ObjectStore {
    /// Every object key in the bucket.
    fn list(&self) -> Result<Vec<String>>;

    /// Uploads a local file under its base name and returns that key.
    fn upload(&self, file: &Path) -> Result<String>;

    fn delete(&self, key: &str) -> Result<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }

    fn upload(&self, file: &Path) -> Result<String> {
        (**self).upload(file)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

/// The key a file is stored under: its base name.
pub fn object_key(file: &Path) -> Result<String> {
    file.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Custom(format!("Cannot derive an object key from {}", file.display())))
}
