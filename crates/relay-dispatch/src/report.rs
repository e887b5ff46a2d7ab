//! Delivery reporting types.

use crate::ports::DeliveryError;
use relay_types::ChatId;

/// The recipients for one event, as two logical groups.
///
/// The pipeline keeps the groups separate so that target-watchers are
/// dispatched before operator-watchers; the dispatcher deduplicates a chat
/// present in both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientGroups {
    /// Chats subscribed to the operation's subject address.
    pub target_watchers: Vec<ChatId>,
    /// Chats subscribed to the operating address.
    pub operator_watchers: Vec<ChatId>,
}

impl RecipientGroups {
    pub fn new(target_watchers: Vec<ChatId>, operator_watchers: Vec<ChatId>) -> Self {
        Self {
            target_watchers,
            operator_watchers,
        }
    }

    /// True when neither group has a recipient. The pipeline short-circuits
    /// on this before any name resolution.
    pub fn is_empty(&self) -> bool {
        self.target_watchers.is_empty() && self.operator_watchers.is_empty()
    }

    /// Delivery order: target-watchers first, then operator-watchers not
    /// already present in the first group.
    pub fn delivery_order(&self) -> Vec<ChatId> {
        let mut ordered = self.target_watchers.clone();
        for chat in &self.operator_watchers {
            if !ordered.contains(chat) {
                ordered.push(*chat);
            }
        }
        ordered
    }
}

/// One recipient's delivery result.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub chat: ChatId,
    pub result: Result<(), DeliveryError>,
}

/// Per-recipient outcomes for one dispatched event.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_order_dedupes_across_groups() {
        let groups = RecipientGroups::new(vec![1, 2], vec![2, 3]);
        assert_eq!(groups.delivery_order(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_groups() {
        assert!(RecipientGroups::default().is_empty());
        assert!(!RecipientGroups::new(vec![1], vec![]).is_empty());
    }
}
