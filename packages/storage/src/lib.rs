pub mod adapter;
pub mod descriptor;
pub mod error;
pub mod filesystem;
pub mod gc;
pub mod object_store;
pub mod pipeline;
pub mod records;

#[cfg(test)]
pub(crate) mod testutil;

pub use adapter::{BlobAdapter, FileStream, INLINE_THRESHOLD};
pub use descriptor::{FileDescriptor, ObjectId, StorageRef};
pub use error::StorageError;
pub use filesystem::FilesystemObjectStore;
pub use gc::{GarbageCollector, SweepError, SweepFailure, SweepReport};
pub use object_store::{BoxReader, NewObject, ObjectStore, StoredObject};
pub use pipeline::{ALLOWED_CONTENT_TYPES, IncomingFile, MAX_UPLOAD_SIZE, UploadPipeline};
pub use records::RecordStore;
