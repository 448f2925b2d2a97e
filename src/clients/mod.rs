pub mod detection;
pub mod storage;

pub use detection::{DetectionApiClient, HttpDetectionClient};
pub use storage::{HttpStorageClient, StorageClient};
