pub mod context;
pub mod digest;
pub mod error;
pub mod labels;

pub use context::{CancelHandle, Context};
pub use digest::Digest;
pub use error::CoreError;
pub use labels::{LabelSet, LabelStore, MemoryLabelStore};
