pub mod twilio;

use async_trait::async_trait;

use crate::models::{Language, ReservationSlots};
use crate::services::escalation::EscalationTier;
use crate::services::replies;

/// Outbound text channel used to alert the restaurant owner.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Text sent to the owner when a call escalates.
pub fn owner_alert(
    tier: EscalationTier,
    slots: &ReservationSlots,
    caller: Option<&str>,
) -> String {
    let headline = match tier {
        EscalationTier::PrivateEvent => "Private event request",
        EscalationTier::LargeGroup => "Large group booking pending confirmation",
        EscalationTier::Normal => "Booking",
    };

    let mut lines = vec![headline.to_string()];
    if let Some(n) = slots.party_size {
        lines.push(format!("Party: {n}"));
    }
    if let Some(date) = slots.date {
        lines.push(format!("Date: {}", replies::spoken_date(date, Language::En)));
    }
    if let Some(time) = slots.time {
        lines.push(format!("Time: {}", time.format("%H:%M")));
    }
    if let Some(name) = &slots.customer_name {
        lines.push(format!("Name: {name}"));
    }
    if let Some(email) = &slots.customer_email {
        lines.push(format!("Email: {email}"));
    }
    if let Some(caller) = caller {
        lines.push(format!("Caller: {caller}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_owner_alert_lists_known_details() {
        let slots = ReservationSlots {
            date: NaiveDate::from_ymd_opt(2025, 6, 14),
            party_size: Some(50),
            customer_name: Some("Marco".to_string()),
            ..Default::default()
        };
        let text = owner_alert(EscalationTier::PrivateEvent, &slots, Some("+39111"));
        assert!(text.starts_with("Private event request"));
        assert!(text.contains("Party: 50"));
        assert!(text.contains("Date: Saturday, June 14"));
        assert!(text.contains("Caller: +39111"));
        assert!(!text.contains("Time:"));
    }
}
