//! Priority queue of pending actions.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bot_core::{Action, ActionSummary};

/// Heap entry ordered by `(priority, sequence)`.
///
/// `BinaryHeap` is a max-heap, so the comparison is reversed: the entry with
/// the lowest priority value, and among equals the lowest sequence, is "greatest".
/// The action itself never takes part in the comparison.
#[derive(Debug)]
pub struct PrioritizedAction {
    pub priority: u32,
    pub sequence: u64,
    pub action: Action,
}

impl PrioritizedAction {
    fn key(&self) -> (u32, u64) {
        (self.priority, self.sequence)
    }
}

impl PartialEq for PrioritizedAction {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PrioritizedAction {}

impl PartialOrd for PrioritizedAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedAction {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Pending actions plus the sequence counter.
///
/// The counter lives next to the heap so that assigning a sequence and
/// inserting happen under the same lock. It is never reset.
#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: BinaryHeap<PrioritizedAction>,
    next_sequence: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an action and returns the sequence assigned to it.
    pub fn push(&mut self, action: Action) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(PrioritizedAction {
            priority: action.priority(),
            sequence,
            action,
        });
        sequence
    }

    pub fn pop(&mut self) -> Option<PrioritizedAction> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<ActionSummary> {
        self.heap.peek().map(|entry| entry.action.summary())
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.heap.len();
        self.heap.clear();
        removed
    }

    /// Drops every action submitted by `module`, returning how many were removed.
    pub fn remove_module(&mut self, module: &str) -> usize {
        let before = self.heap.len();
        self.heap
            .retain(|entry| entry.action.source_module() != module);
        before - self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_core::ActionType;

    fn action(kind: ActionType, module: &str) -> Action {
        Action::new(kind, module, || Ok(true))
    }

    #[test]
    fn pops_lowest_priority_first() {
        let mut queue = PendingQueue::new();
        queue.push(action(ActionType::UseItem, "healer"));
        queue.push(action(ActionType::Attack, "targeting"));
        queue.push(action(ActionType::Walk, "cavebot"));

        let order: Vec<ActionType> = std::iter::from_fn(|| queue.pop())
            .map(|entry| entry.action.action_type())
            .collect();
        assert_eq!(
            order,
            vec![ActionType::Attack, ActionType::Walk, ActionType::UseItem]
        );
    }

    #[test]
    fn equal_priorities_are_fifo() {
        let mut queue = PendingQueue::new();
        for module in ["a", "b", "c", "d"] {
            queue.push(action(ActionType::Say, module));
        }

        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|entry| entry.action.source_module().to_owned())
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn sequences_survive_clear() {
        let mut queue = PendingQueue::new();
        assert_eq!(queue.push(action(ActionType::Say, "chat")), 0);
        assert_eq!(queue.push(action(ActionType::Say, "chat")), 1);
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.push(action(ActionType::Say, "chat")), 2);
    }

    #[test]
    fn remove_module_keeps_others_ordered() {
        let mut queue = PendingQueue::new();
        queue.push(action(ActionType::Loot, "trainer"));
        queue.push(action(ActionType::Attack, "targeting"));
        queue.push(action(ActionType::Eat, "trainer"));
        queue.push(action(ActionType::Say, "responder"));

        assert_eq!(queue.remove_module("trainer"), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop().map(|entry| entry.action.action_type()),
            Some(ActionType::Attack)
        );
        assert_eq!(
            queue.pop().map(|entry| entry.action.action_type()),
            Some(ActionType::Say)
        );
    }

    #[test]
    fn override_priority_is_used_for_ordering() {
        let mut queue = PendingQueue::new();
        queue.push(action(ActionType::Attack, "targeting"));
        queue.push(action(ActionType::Say, "responder").with_priority(1));

        let first = queue.pop().map(|entry| entry.action.action_type());
        assert_eq!(first, Some(ActionType::Say));
    }
}
