use std::collections::VecDeque;

use crate::command::Command;

/// Capacity-bounded LIFO of commands. The oldest entry is evicted when a push
/// would exceed capacity.
#[derive(Debug, Clone)]
pub struct BoundedStack {
    capacity: usize,
    entries: VecDeque<Command>,
}

impl BoundedStack {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change capacity, evicting the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        self.trim()
    }

    /// Push `command`, returning the evicted entry if any.
    pub fn push(&mut self, command: Command) -> Option<Command> {
        self.entries.push_back(command);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Command> {
        self.entries.iter()
    }

    fn trim(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..excess);
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RichText;

    fn cmd(doc: &RichText, i: usize) -> Command {
        Command::insert(doc, i, "x")
    }

    #[test]
    fn push_beyond_capacity_evicts_oldest() {
        let doc = RichText::from_text("");
        let mut stack = BoundedStack::new(2);
        assert!(stack.push(cmd(&doc, 0)).is_none());
        assert!(stack.push(cmd(&doc, 1)).is_none());
        let evicted = stack.push(cmd(&doc, 2)).unwrap();
        assert_eq!(evicted.apply(), cmd(&doc, 0).apply());
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().apply(), cmd(&doc, 2).apply());
    }

    #[test]
    fn shrinking_capacity_trims_oldest() {
        let doc = RichText::from_text("");
        let mut stack = BoundedStack::new(5);
        for i in 0..5 {
            stack.push(cmd(&doc, i));
        }
        assert_eq!(stack.set_capacity(3), 2);
        let remaining: Vec<_> = stack.iter().map(|c| c.apply()).collect();
        let expected: Vec<_> = (2..5).map(|i| cmd(&doc, i).apply()).collect();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let stack = BoundedStack::new(0);
        assert_eq!(stack.capacity(), 1);
    }
}
