pub mod capture;
pub mod recorder;

pub use capture::{AudioCapture, AudioFrame, CaptureConfig, CpalCapture, BYTES_PER_SAMPLE};
pub use recorder::{FrameRecorder, StagedRecording};
