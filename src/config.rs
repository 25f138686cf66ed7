use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transcribe: TranscribeConfig,
    pub session: SessionLimits,
    pub bus: BusConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Directory for staged raw captures
    pub staging_path: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeConfig {
    /// Base URL of the streaming endpoint (the resolver appends stream
    /// settings; a signing resolver replaces this entirely)
    pub endpoint: String,
    /// Origin header presented during the handshake (empty = none)
    pub origin: String,
    pub language_code: String,
    pub media_encoding: String,
    pub channel_identification: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionLimits {
    /// Hard ceiling on meeting length, in seconds
    pub max_duration_secs: u64,
    /// Drop-dead deadline for teardown steps, in seconds
    pub teardown_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct BusConfig {
    pub url: String,
    pub subject_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// Directory finished recordings are published into
    pub output_path: String,
    /// Advertised URL prefix for published recordings (empty = file path)
    pub url_prefix: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
