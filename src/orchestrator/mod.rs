pub mod batch_processor;
pub mod folder_processor;

pub use batch_processor::{App, ProcessingStats};
pub use folder_processor::process_folder;
