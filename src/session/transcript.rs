//! Conversation transcript.
//!
//! [`Transcript`] always starts with exactly one system entry.  The only
//! mutations are appending user/assistant turns and resetting back to the
//! system entry, so the invariant cannot be broken from outside.

use serde::Serialize;

/// Who said a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One line of the conversation, in the chat wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Insertion-ordered conversation log.
///
/// ```
/// use growth_assistant::session::{Role, Transcript};
///
/// let mut t = Transcript::new("be brief");
/// t.push_user("Hi");
/// assert_eq!(t.len(), 2);
/// assert_eq!(t.entries()[0].role, Role::System);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            entries: vec![TranscriptEntry::new(Role::System, system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(TranscriptEntry::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries
            .push(TranscriptEntry::new(Role::Assistant, content));
    }

    /// Drop every turn, keeping only the system entry.
    pub fn reset(&mut self) {
        self.entries.truncate(1);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Entries after the system prompt.
    pub fn turns(&self) -> &[TranscriptEntry] {
        &self.entries[1..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the system entry is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_single_system_entry() {
        let t = Transcript::new("prompt");
        assert_eq!(t.len(), 1);
        assert_eq!(t.entries()[0], TranscriptEntry::new(Role::System, "prompt"));
        assert!(t.turns().is_empty());
    }

    #[test]
    fn appends_in_order() {
        let mut t = Transcript::new("prompt");
        t.push_user("Hi");
        t.push_assistant("Hello!");
        t.push_user("Prices?");

        let roles: Vec<Role> = t.entries().iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
    }

    #[test]
    fn reset_keeps_system_prompt() {
        let mut t = Transcript::new("prompt");
        t.push_user("Hi");
        t.push_assistant("Hello!");
        t.reset();

        assert_eq!(t, Transcript::new("prompt"));
    }

    #[test]
    fn serializes_to_chat_message_shape() {
        let entry = TranscriptEntry::new(Role::Assistant, "Sure.");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "Sure." }));
    }
}
