mod disk;

pub use disk::{FileStorage, StagedUpload, StorageError, StoredObject, UPLOADS_DIR};
