pub mod job;
pub mod manifest;
pub mod results;
pub mod task;

pub use job::JobRequest;
pub use manifest::{Chunk, Manifest};
pub use results::{CombinedResult, DetectionImage, ResultFile, ResultPayload};
pub use task::{RequestStatus, TaskGroup, TaskId, TaskStatusRecord};
