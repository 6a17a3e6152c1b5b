/// Media domain and service
///
/// A media record couples raw bytes with derived metadata. The store
/// deduplicates identical content across owners through a backreference
/// index and prunes content when the last reference disappears.

pub mod models;
pub mod store;

pub use models::{Media, MediaId, MediaMeta};
pub use store::{DeleteOutcome, MediaConfig, MediaStore};
