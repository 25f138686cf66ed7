//! Recording finalization
//!
//! Once the staged raw capture is closed, the finalizer wraps it in a
//! standard WAV container and the store publishes the result to its durable
//! location.

pub mod finalizer;
pub mod store;

pub use finalizer::{FinalizedRecording, RecordingFinalizer, WavSpec};
pub use store::{FsRecordingStore, RecordingStore};
