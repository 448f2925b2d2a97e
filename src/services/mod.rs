pub mod chunker;
pub mod collector;
pub mod combiner;
pub mod job_builder;
pub mod manifest_builder;
pub mod poller;
pub mod registry;
pub mod resubmission;

pub use collector::ResultCollector;
pub use job_builder::JobRequestBuilder;
pub use manifest_builder::ManifestBuilder;
pub use poller::{BackoffPolicy, StatusPoller};
pub use registry::TaskRegistry;
pub use resubmission::ResubmissionDecision;
