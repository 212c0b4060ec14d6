use serde::Serialize;

use crate::models::EscalationThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    Normal,
    LargeGroup,
    PrivateEvent,
}

/// What a finalized booking turns into for each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationAction {
    Book,
    BookPendingConfirmation,
    NotifyOwnerOnly,
}

impl EscalationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationTier::Normal => "normal",
            EscalationTier::LargeGroup => "large_group",
            EscalationTier::PrivateEvent => "private_event",
        }
    }

    pub fn action(&self) -> EscalationAction {
        match self {
            EscalationTier::Normal => EscalationAction::Book,
            EscalationTier::LargeGroup => EscalationAction::BookPendingConfirmation,
            EscalationTier::PrivateEvent => EscalationAction::NotifyOwnerOnly,
        }
    }
}

/// An unknown party size is treated as a normal booking.
pub fn classify(party_size: Option<u32>, thresholds: &EscalationThresholds) -> EscalationTier {
    match party_size {
        Some(n) if n >= thresholds.private_event => EscalationTier::PrivateEvent,
        Some(n) if n > thresholds.large_group => EscalationTier::LargeGroup,
        _ => EscalationTier::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> EscalationThresholds {
        EscalationThresholds {
            large_group: 10,
            private_event: 45,
        }
    }

    #[test]
    fn test_boundaries() {
        let t = thresholds();
        assert_eq!(classify(Some(2), &t), EscalationTier::Normal);
        assert_eq!(classify(Some(10), &t), EscalationTier::Normal);
        assert_eq!(classify(Some(11), &t), EscalationTier::LargeGroup);
        assert_eq!(classify(Some(44), &t), EscalationTier::LargeGroup);
        assert_eq!(classify(Some(45), &t), EscalationTier::PrivateEvent);
        assert_eq!(classify(Some(120), &t), EscalationTier::PrivateEvent);
        assert_eq!(classify(None, &t), EscalationTier::Normal);
    }

    #[test]
    fn test_thresholds_are_configuration() {
        let t = EscalationThresholds {
            large_group: 6,
            private_event: 20,
        };
        assert_eq!(classify(Some(7), &t), EscalationTier::LargeGroup);
        assert_eq!(classify(Some(20), &t), EscalationTier::PrivateEvent);
    }

    #[test]
    fn test_actions_per_tier() {
        assert_eq!(EscalationTier::Normal.action(), EscalationAction::Book);
        assert_eq!(
            EscalationTier::LargeGroup.action(),
            EscalationAction::BookPendingConfirmation
        );
        assert_eq!(
            EscalationTier::PrivateEvent.action(),
            EscalationAction::NotifyOwnerOnly
        );
    }
}
