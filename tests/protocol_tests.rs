// Integration tests for the binary wire protocol
//
// These tests verify that encode/decode round-trip every header type,
// that corruption anywhere in a message is detected, and that inbound
// messages classify correctly.

use chrono::TimeZone;
use meeting_scribe::protocol::{self, HeaderValue, ProtocolError, WireMessage};
use meeting_scribe::transcribe::{classify, InboundEvent};

fn sample_message() -> WireMessage {
    WireMessage::new(
        vec![
            (":message-type".to_string(), HeaderValue::from("event")),
            (
                ":event-type".to_string(),
                HeaderValue::from("TranscriptEvent"),
            ),
            ("attempt".to_string(), HeaderValue::Integer(3)),
            ("final".to_string(), HeaderValue::Boolean(true)),
            ("session".to_string(), HeaderValue::Bytes(vec![1, 2, 3, 4])),
            (
                "sent-at".to_string(),
                HeaderValue::Timestamp(
                    chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
                ),
            ),
        ],
        b"payload bytes".to_vec(),
    )
}

#[test]
fn test_round_trip_all_header_types() {
    let message = sample_message();
    let encoded = protocol::encode(&message).unwrap();
    let decoded = protocol::decode(&encoded).unwrap();

    assert_eq!(decoded, message);
}

#[test]
fn test_round_trip_empty_headers_and_payload() {
    let message = WireMessage::new(vec![], vec![]);
    let encoded = protocol::encode(&message).unwrap();
    let decoded = protocol::decode(&encoded).unwrap();

    assert!(decoded.headers.is_empty());
    assert!(decoded.payload.is_empty());
}

#[test]
fn test_flipping_any_byte_is_detected() {
    let encoded = protocol::encode(&sample_message()).unwrap();

    for index in 0..encoded.len() {
        let mut corrupted = encoded.clone();
        corrupted[index] ^= 0x01;

        match protocol::decode(&corrupted) {
            Err(ProtocolError::CorruptMessage { .. }) => {}
            other => panic!(
                "flipping byte {} should corrupt the message, got {:?}",
                index, other
            ),
        }
    }
}

#[test]
fn test_truncated_message_is_corrupt() {
    let encoded = protocol::encode(&sample_message()).unwrap();

    for len in 0..16.min(encoded.len()) {
        assert!(
            matches!(
                protocol::decode(&encoded[..len]),
                Err(ProtocolError::CorruptMessage { .. })
            ),
            "{} bytes should not decode",
            len
        );
    }
}

#[test]
fn test_duplicate_header_names_rejected() {
    let message = WireMessage::new(
        vec![
            ("name".to_string(), HeaderValue::from("first")),
            ("name".to_string(), HeaderValue::from("second")),
        ],
        vec![],
    );
    let encoded = protocol::encode(&message).unwrap();

    assert!(matches!(
        protocol::decode(&encoded),
        Err(ProtocolError::CorruptMessage { .. })
    ));
}

#[test]
fn test_oversized_header_name_rejected_at_encode() {
    let message = WireMessage::new(
        vec![("n".repeat(300), HeaderValue::from("value"))],
        vec![],
    );

    assert!(matches!(
        protocol::encode(&message),
        Err(ProtocolError::OversizedHeader { .. })
    ));
}

#[test]
fn test_audio_event_headers_and_payload() {
    let pcm = vec![0u8, 1, 2, 3, 254, 255];
    let encoded = protocol::audio_event(&pcm).unwrap();
    let decoded = protocol::decode(&encoded).unwrap();

    assert_eq!(decoded.header_str(":message-type"), Some("event"));
    assert_eq!(decoded.header_str(":event-type"), Some("AudioEvent"));
    assert_eq!(decoded.payload, pcm);
}

#[test]
fn test_classify_transcript_event() {
    let payload = serde_json::json!({
        "Transcript": {
            "Results": [{
                "StartTime": 1.25,
                "EndTime": 2.5,
                "IsPartial": true,
                "Alternatives": [
                    { "Transcript": "hello world" },
                    { "Transcript": "hallo world" }
                ]
            }]
        }
    });
    let message = WireMessage::new(
        vec![
            (":message-type".to_string(), HeaderValue::from("event")),
            (
                ":event-type".to_string(),
                HeaderValue::from("TranscriptEvent"),
            ),
        ],
        serde_json::to_vec(&payload).unwrap(),
    );

    match classify(&message).unwrap() {
        InboundEvent::Transcript(results) => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].transcript, "hello world");
            assert_eq!(results[0].alternative_text, "hallo world");
            assert_eq!(results[0].start_time, Some(1.25));
            assert_eq!(results[0].end_time, Some(2.5));
            assert!(results[0].is_partial);
        }
        other => panic!("expected transcript event, got {:?}", other),
    }
}

#[test]
fn test_classify_exception() {
    let message = WireMessage::new(
        vec![(":message-type".to_string(), HeaderValue::from("exception"))],
        serde_json::to_vec(&serde_json::json!({ "Message": "stream expired" })).unwrap(),
    );

    match classify(&message).unwrap() {
        InboundEvent::Exception { message } => assert_eq!(message, "stream expired"),
        other => panic!("expected exception, got {:?}", other),
    }
}

#[test]
fn test_classify_other_event_type() {
    let message = WireMessage::new(
        vec![
            (":message-type".to_string(), HeaderValue::from("event")),
            (":event-type".to_string(), HeaderValue::from("UtteranceEvent")),
        ],
        vec![],
    );

    match classify(&message).unwrap() {
        InboundEvent::Other { event_type } => assert_eq!(event_type, "UtteranceEvent"),
        other => panic!("expected other event, got {:?}", other),
    }
}

#[test]
fn test_classify_missing_message_type() {
    let message = WireMessage::new(vec![], vec![]);

    assert!(matches!(
        classify(&message),
        Err(ProtocolError::CorruptMessage { .. })
    ));
}

#[test]
fn test_classify_malformed_transcript_payload() {
    let message = WireMessage::new(
        vec![
            (":message-type".to_string(), HeaderValue::from("event")),
            (
                ":event-type".to_string(),
                HeaderValue::from("TranscriptEvent"),
            ),
        ],
        b"not json".to_vec(),
    );

    assert!(matches!(
        classify(&message),
        Err(ProtocolError::CorruptMessage { .. })
    ));
}

#[test]
fn test_results_without_alternatives_decode_empty() {
    let payload = serde_json::json!({
        "Transcript": {
            "Results": [{
                "StartTime": null,
                "EndTime": null,
                "IsPartial": false,
                "Alternatives": []
            }]
        }
    });
    let message = WireMessage::new(
        vec![
            (":message-type".to_string(), HeaderValue::from("event")),
            (
                ":event-type".to_string(),
                HeaderValue::from("TranscriptEvent"),
            ),
        ],
        serde_json::to_vec(&payload).unwrap(),
    );

    match classify(&message).unwrap() {
        InboundEvent::Transcript(results) => {
            assert_eq!(results.len(), 1);
            assert!(results[0].transcript.is_empty());
            assert_eq!(results[0].start_time, None);
        }
        other => panic!("expected transcript event, got {:?}", other),
    }
}
