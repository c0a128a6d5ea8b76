//! Conversation data model: speakers, messages, and the append-only transcript.

use serde::{Deserialize, Serialize};

/// Origin of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Ai,
}

/// One utterance by one speaker. Fields are private so a message cannot change
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    speaker: Speaker,
    content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            content: content.into(),
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn to_record(&self) -> MessageRecord {
        MessageRecord {
            speaker: self.speaker,
            content: self.content.clone(),
        }
    }
}

/// Serialized form of a [`Message`]: `{"speaker": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub speaker: Speaker,
    pub content: String,
}

/// Ordered conversation log. Insertion order is conversational order.
/// Append-only: messages are never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Snapshot the transcript as records, in append order.
    pub fn to_records(&self) -> Vec<MessageRecord> {
        self.messages.iter().map(Message::to_record).collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_tag_speaker() {
        assert_eq!(Message::human("hi").speaker(), Speaker::Human);
        assert_eq!(Message::ai("hello").speaker(), Speaker::Ai);
        assert_eq!(Message::ai("hello").content(), "hello");
    }

    #[test]
    fn records_follow_append_order() {
        let mut transcript = Transcript::new();
        let contents = ["measure mass", "10 kg", "tilt the plane", "slips at 31 degrees"];
        for (i, content) in contents.iter().enumerate() {
            if i % 2 == 0 {
                transcript.push(Message::human(*content));
            } else {
                transcript.push(Message::ai(*content));
            }
        }

        let records = transcript.to_records();
        assert_eq!(records.len(), contents.len());
        let got: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(got, contents);
        assert_eq!(records[0].speaker, Speaker::Human);
        assert_eq!(records[1].speaker, Speaker::Ai);
    }

    #[test]
    fn push_leaves_earlier_messages_untouched() {
        let mut transcript = Transcript::new();
        transcript.push(Message::human("first"));
        let before = transcript.to_records();

        transcript.push(Message::ai("second"));
        transcript.push(Message::human("third"));

        let after = transcript.to_records();
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(transcript.last().map(Message::content), Some("third"));
    }

    #[test]
    fn record_serializes_speaker_then_content() {
        let record = Message::ai("reply").to_record();
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(json, r#"{"speaker":"ai","content":"reply"}"#);
    }

    #[test]
    fn empty_transcript_has_no_records() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert!(transcript.to_records().is_empty());
    }
}
