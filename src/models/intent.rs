use serde::{Deserialize, Serialize};

use super::PartialReservationSlots;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueIntent {
    #[default]
    NoOp,
    AskDate,
    AskTime,
    AskPartySize,
    AskName,
    AskEmail,
    AnswerInformational,
    FinalizeBooking,
    CancelBooking,
}

impl DialogueIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueIntent::NoOp => "no_op",
            DialogueIntent::AskDate => "ask_date",
            DialogueIntent::AskTime => "ask_time",
            DialogueIntent::AskPartySize => "ask_party_size",
            DialogueIntent::AskName => "ask_name",
            DialogueIntent::AskEmail => "ask_email",
            DialogueIntent::AnswerInformational => "answer_informational",
            DialogueIntent::FinalizeBooking => "finalize_booking",
            DialogueIntent::CancelBooking => "cancel_booking",
        }
    }

    /// Lenient label parsing for model output; anything unrecognized is `NoOp`.
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "ask_date" | "ask_day" | "request_date" => DialogueIntent::AskDate,
            "ask_time" | "ask_hour" | "request_time" => DialogueIntent::AskTime,
            "ask_party_size" | "ask_people" | "ask_guests" | "ask_persons" => {
                DialogueIntent::AskPartySize
            }
            "ask_name" | "request_name" => DialogueIntent::AskName,
            "ask_email" | "ask_mail" | "request_email" => DialogueIntent::AskEmail,
            "answer_informational" | "informational" | "info" | "answer_question"
            | "general_question" => DialogueIntent::AnswerInformational,
            "finalize_booking" | "finalize" | "book" | "create_booking" | "confirm_booking"
            | "prenota" => DialogueIntent::FinalizeBooking,
            "cancel_booking" | "cancel" | "cancel_reservation" | "annulla" => {
                DialogueIntent::CancelBooking
            }
            _ => DialogueIntent::NoOp,
        }
    }
}

/// A structured, validated view of one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NluProposal {
    pub reply_text: String,
    pub intent: DialogueIntent,
    pub slots: PartialReservationSlots,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_aliases() {
        assert_eq!(DialogueIntent::parse("ask_email"), DialogueIntent::AskEmail);
        assert_eq!(DialogueIntent::parse("Finalize-Booking"), DialogueIntent::FinalizeBooking);
        assert_eq!(DialogueIntent::parse("ask party size"), DialogueIntent::AskPartySize);
        assert_eq!(DialogueIntent::parse("cancel"), DialogueIntent::CancelBooking);
        assert_eq!(DialogueIntent::parse("whatever"), DialogueIntent::NoOp);
    }

    #[test]
    fn test_as_str_matches_serde_name() {
        let json = serde_json::to_string(&DialogueIntent::AnswerInformational).unwrap();
        assert_eq!(json, format!("\"{}\"", DialogueIntent::AnswerInformational.as_str()));
    }
}
