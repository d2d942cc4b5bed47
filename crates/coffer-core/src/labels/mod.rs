//! Label bookkeeping for content-addressed entries.
//!
//! Labels are free-form string-to-string annotations attached to a content
//! digest, used by the content subsystem for garbage-collection roots and
//! unpack tracking. This module provides the [`LabelStore`] seam and its
//! in-memory implementation, [`MemoryLabelStore`].

mod store;

pub use store::{LabelSet, LabelStore, MemoryLabelStore};

/// Marks content as a garbage-collection root; GC never sweeps entries
/// carrying this label.
pub const GC_ROOT_LABEL: &str = "coffer.io/gc.root";

/// Records the digest of the uncompressed form of compressed content.
pub const UNCOMPRESSED_LABEL: &str = "coffer.io/uncompressed";
