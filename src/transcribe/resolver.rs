use anyhow::Result;
use async_trait::async_trait;

/// Stream parameters the resolver encodes into the connection URL
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub sample_rate: u32,
    pub language_code: String,
    /// Encoding identifier understood by the service (e.g. "pcm")
    pub media_encoding: String,
    pub channel_count: u16,
    pub channel_identification: bool,
}

/// A resolved connection target: URL plus handshake headers
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Produces the URL and header set for the duplex connection
///
/// Deployments that require signed URLs implement this against their
/// authentication service; signing itself is outside this crate.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self, settings: &StreamSettings) -> Result<Endpoint>;
}

/// Resolver that appends the stream settings to a preconfigured base URL
pub struct StaticEndpointResolver {
    base_url: String,
    headers: Vec<(String, String)>,
}

impl StaticEndpointResolver {
    pub fn new(base_url: String, headers: Vec<(String, String)>) -> Self {
        Self { base_url, headers }
    }
}

#[async_trait]
impl EndpointResolver for StaticEndpointResolver {
    async fn resolve(&self, settings: &StreamSettings) -> Result<Endpoint> {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}language-code={}&media-encoding={}&sample-rate={}&number-of-channels={}",
            self.base_url,
            separator,
            settings.language_code,
            settings.media_encoding,
            settings.sample_rate,
            settings.channel_count,
        );
        if settings.channel_identification {
            url.push_str("&enable-channel-identification=true");
        }

        Ok(Endpoint {
            url,
            headers: self.headers.clone(),
        })
    }
}
