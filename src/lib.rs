pub mod audio;
pub mod bus;
pub mod config;
pub mod http;
pub mod protocol;
pub mod recording;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioCapture, AudioFrame, CaptureConfig, CpalCapture, FrameRecorder, StagedRecording,
};
pub use bus::{BusClient, BusTransport, EventType, MemoryTransport, NatsTransport};
pub use config::Config;
pub use http::{create_router, AppState};
pub use protocol::{HeaderValue, ProtocolError, WireMessage};
pub use recording::{
    FinalizedRecording, FsRecordingStore, RecordingFinalizer, RecordingStore, WavSpec,
};
pub use session::{
    CaptionEntry, MeetingExport, MeetingNotes, MeetingSignal, SessionConfig, SessionState,
    SessionSummary, StreamingSession,
};
pub use transcribe::{
    EndpointResolver, InboundEvent, MessageSink, MessageSource, StaticEndpointResolver,
    StreamSettings, TranscriptResult,
};
