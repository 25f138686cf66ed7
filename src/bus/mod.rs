pub mod client;
pub mod records;

pub use client::{BusClient, BusTransport, MemoryTransport, NatsTransport};
pub use records::{
    EventType, LifecycleRecord, RecordingUrlRecord, TranscriptSegmentRecord, CHANNEL,
};
