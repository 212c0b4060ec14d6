//! Reconciles the model's declared intent with what the call actually knows.
//!
//! The rules run in a fixed order and each sees the output of the previous one. After them,
//! `FinalizeBooking` is only ever returned with date, time and name known and with a reply that
//! asks nothing.

use crate::models::{DialogueIntent, ReservationSlots, Slot};

/// Openers that make a clause a question even without a question mark.
const INTERROGATIVE_OPENERS: &[&str] = &[
    "could you",
    "can you",
    "would you",
    "may i have",
    "what time",
    "how many",
    "mi può",
    "mi puo",
    "mi potrebbe",
    "mi dice",
    "mi dica",
    "a che ora",
    "quante persone",
    "per quante",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    NameAlreadyKnown,
    InformationalPayloadCleared,
    FinalizeMissing(Slot),
    RedundantEmailQuestion,
    FinalizeStillAsking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedIntent {
    pub intent: DialogueIntent,
    /// Slots to return with the reply. Empty for informational answers; the session keeps its
    /// own copy untouched.
    pub reply_slots: ReservationSlots,
    pub corrections: Vec<Correction>,
}

impl CorrectedIntent {
    /// True when the intent label itself was changed.
    pub fn rerouted(&self) -> bool {
        self.corrections
            .iter()
            .any(|c| *c != Correction::InformationalPayloadCleared)
    }
}

pub fn correct(intent: DialogueIntent, slots: &ReservationSlots, reply_text: &str) -> CorrectedIntent {
    let mut intent = intent;
    let mut reply_slots = slots.clone();
    let mut corrections = Vec::new();

    if intent == DialogueIntent::AskName && slots.customer_name.is_some() {
        intent = DialogueIntent::AskEmail;
        corrections.push(Correction::NameAlreadyKnown);
    }

    if intent == DialogueIntent::AnswerInformational {
        reply_slots = ReservationSlots::default();
        corrections.push(Correction::InformationalPayloadCleared);
    }

    if intent == DialogueIntent::FinalizeBooking {
        if let Some(missing) = slots.first_missing_required() {
            intent = ask_for(missing);
            corrections.push(Correction::FinalizeMissing(missing));
        }
    }

    if intent == DialogueIntent::AskEmail && slots.is_fully_known() && !is_question(reply_text) {
        intent = DialogueIntent::FinalizeBooking;
        corrections.push(Correction::RedundantEmailQuestion);
    }

    if intent == DialogueIntent::FinalizeBooking && is_question(reply_text) {
        intent = DialogueIntent::AskTime;
        corrections.push(Correction::FinalizeStillAsking);
    }

    CorrectedIntent {
        intent,
        reply_slots,
        corrections,
    }
}

pub fn ask_for(slot: Slot) -> DialogueIntent {
    match slot {
        Slot::Date => DialogueIntent::AskDate,
        Slot::Time => DialogueIntent::AskTime,
        Slot::PartySize => DialogueIntent::AskPartySize,
        Slot::Name => DialogueIntent::AskName,
        Slot::Email => DialogueIntent::AskEmail,
    }
}

/// A question mark anywhere, or a clause that opens with an interrogative phrase.
pub fn is_question(text: &str) -> bool {
    if text.contains('?') || text.contains('¿') {
        return true;
    }
    let lower = text.to_lowercase();
    lower
        .split(|c: char| matches!(c, '.' | '!' | ';' | ',' | ':' | '\n'))
        .map(str::trim_start)
        .any(opens_with_interrogative)
}

fn opens_with_interrogative(clause: &str) -> bool {
    INTERROGATIVE_OPENERS.iter().any(|opener| {
        clause
            .strip_prefix(opener)
            .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
    })
}
