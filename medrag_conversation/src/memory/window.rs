use medrag_core::ChatMessage;
use std::collections::VecDeque;

/// Keeps the most recent `k` turns verbatim and drops anything older.
#[derive(Debug, Clone)]
pub struct WindowMemory {
    k: usize,
    messages: VecDeque<ChatMessage>,
}

impl WindowMemory {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            messages: VecDeque::with_capacity(k * 2),
        }
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.k
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.k * 2 {
            self.messages.pop_front();
        }
    }

    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_k_turns() {
        let mut window = WindowMemory::new(2);
        for i in 1..=3 {
            window.push(ChatMessage::user(format!("q{i}")));
            window.push(ChatMessage::assistant(format!("a{i}")));
        }

        let contents: Vec<String> = window.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["q2", "a2", "q3", "a3"]);
    }

    #[test]
    fn zero_sized_window_holds_nothing() {
        let mut window = WindowMemory::new(0);
        window.push(ChatMessage::user("q"));
        assert!(window.is_empty());
    }
}
