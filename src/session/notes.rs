use serde::Serialize;

use crate::transcribe::TranscriptResult;

/// One line of the caption log
#[derive(Debug, Clone, Serialize)]
pub struct CaptionEntry {
    pub speaker: String,
    pub text: String,
    /// Whether the producing result was already final when it arrived
    pub finalized_at_receipt: bool,
}

/// How a transcript result landed in the caption log
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Result text was empty; nothing recorded
    Ignored,
    /// New utterance appended, attributed to the current speaker
    Appended { speaker: String },
    /// Extension of the previous utterance; the last entry was replaced in
    /// place and keeps its original speaker
    Replaced { speaker: String },
}

impl Reconciliation {
    /// Speaker the caption log attributed this result to, if it was kept
    pub fn speaker(&self) -> Option<&str> {
        match self {
            Reconciliation::Ignored => None,
            Reconciliation::Appended { speaker } | Reconciliation::Replaced { speaker } => {
                Some(speaker)
            }
        }
    }
}

/// A speaker-attributed transcript line, as handed to the report collaborator
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

/// Everything the report collaborator receives at session end
#[derive(Debug, Clone, Serialize)]
pub struct MeetingExport {
    pub attendees: Vec<String>,
    pub messages: Vec<String>,
    pub transcript: Vec<TranscriptLine>,
}

/// Session-scoped meeting record: the caption log, attendee list, chat log
/// and current speaker
///
/// Three independent sources write here (the inbound pump, speaker-change
/// signals, chat signals); all mutation goes through these methods behind
/// one lock, so readers never observe a half-updated entry.
#[derive(Debug, Default)]
pub struct MeetingNotes {
    captions: Vec<CaptionEntry>,
    attendees: Vec<String>,
    messages: Vec<String>,
    current_speaker: String,
}

/// Lower-cased text with ASCII punctuation removed
///
/// The comparison form for deciding whether a new result extends the
/// previous utterance.
fn baseline_form(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect()
}

impl MeetingNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a speaker change; a first sighting also registers attendance
    pub fn set_speaker(&mut self, name: &str) {
        if !self.attendees.iter().any(|a| a == name) {
            self.attendees.push(name.to_string());
        }
        self.current_speaker = name.to_string();
    }

    pub fn current_speaker(&self) -> &str {
        &self.current_speaker
    }

    pub fn add_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    /// Merge one transcript result into the caption log
    ///
    /// If the last entry's baseline form is a substring of the new text's
    /// baseline form, the result extends the same utterance and replaces
    /// the last entry's text without re-evaluating its speaker. Otherwise a
    /// new entry is appended, attributed to the speaker current at this
    /// moment; a concurrent speaker change applies to the next result,
    /// never retroactively.
    pub fn apply_result(&mut self, result: &TranscriptResult) -> Reconciliation {
        if result.transcript.is_empty() {
            return Reconciliation::Ignored;
        }

        let incoming = baseline_form(&result.transcript);
        if let Some(last) = self.captions.last_mut() {
            if incoming.contains(&baseline_form(&last.text)) {
                last.text = result.transcript.clone();
                last.finalized_at_receipt = !result.is_partial;
                return Reconciliation::Replaced {
                    speaker: last.speaker.clone(),
                };
            }
        }

        let speaker = self.current_speaker.clone();
        self.captions.push(CaptionEntry {
            speaker: speaker.clone(),
            text: result.transcript.clone(),
            finalized_at_receipt: !result.is_partial,
        });
        Reconciliation::Appended { speaker }
    }

    pub fn captions(&self) -> &[CaptionEntry] {
        &self.captions
    }

    pub fn caption_count(&self) -> usize {
        self.captions.len()
    }

    /// Build the report collaborator's payload
    pub fn export(&self) -> MeetingExport {
        MeetingExport {
            attendees: self.attendees.clone(),
            messages: self.messages.clone(),
            transcript: self
                .captions
                .iter()
                .map(|entry| TranscriptLine {
                    speaker: entry.speaker.clone(),
                    text: entry.text.clone(),
                })
                .collect(),
        }
    }
}
