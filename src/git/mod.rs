//! Version-control metadata for ingested trees
//!
//! Chunks from a git working tree carry the HEAD commit and origin URL so
//! results can be traced back to an exact revision. Cloning and pulling are
//! left to the caller.

/// HEAD commit and remote lookup
pub mod revision;

pub use revision::SourceRevision;
