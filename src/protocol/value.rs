use chrono::{DateTime, TimeZone, Utc};

/// Wire type tags for header values
pub(crate) const TAG_BOOLEAN: u8 = 0;
pub(crate) const TAG_INTEGER: u8 = 4;
pub(crate) const TAG_BYTES: u8 = 6;
pub(crate) const TAG_STRING: u8 = 7;
pub(crate) const TAG_TIMESTAMP: u8 = 8;

/// A typed header value
///
/// The wire format carries a closed set of value types; every header entry
/// is `{tag, length, bytes}` regardless of type, so decode can always skip
/// an entry it has no use for.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Boolean(bool),
    Integer(i64),
    Bytes(Vec<u8>),
    String(String),
    /// Milliseconds since the Unix epoch on the wire
    Timestamp(DateTime<Utc>),
}

impl HeaderValue {
    pub(crate) fn type_tag(&self) -> u8 {
        match self {
            HeaderValue::Boolean(_) => TAG_BOOLEAN,
            HeaderValue::Integer(_) => TAG_INTEGER,
            HeaderValue::Bytes(_) => TAG_BYTES,
            HeaderValue::String(_) => TAG_STRING,
            HeaderValue::Timestamp(_) => TAG_TIMESTAMP,
        }
    }

    /// Serialize just the value bytes (tag and length are written by the codec)
    pub(crate) fn value_bytes(&self) -> Vec<u8> {
        match self {
            HeaderValue::Boolean(b) => vec![u8::from(*b)],
            HeaderValue::Integer(n) => n.to_be_bytes().to_vec(),
            HeaderValue::Bytes(b) => b.clone(),
            HeaderValue::String(s) => s.as_bytes().to_vec(),
            HeaderValue::Timestamp(t) => t.timestamp_millis().to_be_bytes().to_vec(),
        }
    }

    /// Rebuild a value from its tag and raw bytes
    ///
    /// Returns `None` for unknown tags or bytes that do not fit the tagged
    /// type; the codec reports that as a corrupt message.
    pub(crate) fn from_wire(tag: u8, bytes: &[u8]) -> Option<Self> {
        match tag {
            TAG_BOOLEAN => match bytes {
                [0] => Some(HeaderValue::Boolean(false)),
                [1] => Some(HeaderValue::Boolean(true)),
                _ => None,
            },
            TAG_INTEGER => {
                let raw: [u8; 8] = bytes.try_into().ok()?;
                Some(HeaderValue::Integer(i64::from_be_bytes(raw)))
            }
            TAG_BYTES => Some(HeaderValue::Bytes(bytes.to_vec())),
            TAG_STRING => Some(HeaderValue::String(
                std::str::from_utf8(bytes).ok()?.to_string(),
            )),
            TAG_TIMESTAMP => {
                let raw: [u8; 8] = bytes.try_into().ok()?;
                let millis = i64::from_be_bytes(raw);
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .map(HeaderValue::Timestamp)
            }
            _ => None,
        }
    }

    /// Borrow the value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::String(s.to_string())
    }
}
