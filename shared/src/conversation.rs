//! In-memory conversation history for interactive clients.

use serde::Serialize;

/// One question and the answer shown for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Session-scoped list of turns. Nothing is persisted.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns in display order, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut conversation = Conversation::new();
        conversation.push("first?", "one");
        conversation.push("second?", "two");

        let questions: Vec<&str> = conversation
            .newest_first()
            .map(|turn| turn.question.as_str())
            .collect();
        assert_eq!(questions, vec!["second?", "first?"]);
    }

    #[test]
    fn test_clear() {
        let mut conversation = Conversation::new();
        conversation.push("q", "a");
        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.len(), 0);
    }
}
