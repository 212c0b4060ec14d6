use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{
    CallSession, DialogueIntent, Language, NluProposal, PartialReservationSlots,
};
use crate::services::ai::{LlmProvider, Message};
use crate::services::{replies, slots};

const SYSTEM_PROMPT: &str = r#"You are the phone receptionist of a restaurant. You take table reservations over a voice call, one caller sentence at a time. Your words are read aloud by a speech synthesizer: no lists, no emoji, no markdown, short sentences.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "reply": "what you say to the caller",
  "intent": "no_op|ask_date|ask_time|ask_party_size|ask_name|ask_email|answer_informational|finalize_booking|cancel_booking",
  "slots": {
    "date": "YYYY-MM-DD or null",
    "time": "HH:MM or null",
    "party_size": number or null,
    "customer_name": "name or null",
    "customer_email": "address or null"
  }
}

Intent rules:
- "ask_date", "ask_time", "ask_party_size", "ask_name", "ask_email": your reply asks for that one piece of information
- "answer_informational": the caller asked something unrelated to a booking (opening hours, menu, address)
- "finalize_booking": date, time and name are known and the caller has given or declined an email; your reply confirms, it never asks anything
- "cancel_booking": the caller wants to cancel an existing reservation
- "no_op": small talk or nothing actionable

Slot rules:
- Only fill a slot with what the caller said in this conversation; use null for anything not said
- Never invent a year: dates refer to today or later
- An email address may be dictated letter by letter; join the pieces without spaces
"#;

pub async fn propose(
    llm: &dyn LlmProvider,
    session: &CallSession,
    today: NaiveDate,
) -> Result<NluProposal, AppError> {
    let messages: Vec<Message> = session.messages.iter().map(Message::from).collect();
    let system = system_prompt(session, today);

    let response = llm
        .chat(&system, &messages)
        .await
        .map_err(|e| AppError::Ai(format!("{}: {e}", llm.name())))?;

    Ok(parse_proposal(&response, session.language))
}

fn system_prompt(session: &CallSession, today: NaiveDate) -> String {
    let restaurant = &session.restaurant;
    let known = serde_json::to_string(&session.reservation).unwrap_or_else(|_| "{}".to_string());
    let hours_rule = if restaurant.time_defaults.assume_pm_for_bare_hours {
        "\nAn hour from 1 to 11 said without morning/afternoon means the evening (\"at 8\" is 20:00)."
    } else {
        ""
    };
    let language = match session.language {
        Language::It => "Italian",
        Language::En => "English",
    };

    format!(
        "{SYSTEM_PROMPT}{hours_rule}\n\nRestaurant: {name}\nToday is {weekday} {today}.\nSpeak {language}.\nAlready known for this call: {known}",
        name = restaurant.name,
        weekday = today.format("%A"),
        today = today.format("%Y-%m-%d"),
    )
}

/// Turns a raw model response into a proposal. Never fails: anything unusable becomes the
/// fallback proposal.
pub fn parse_proposal(response: &str, language: Language) -> NluProposal {
    match extract_json(response).and_then(|v| proposal_from_value(&v)) {
        Some(proposal) => proposal,
        None => {
            tracing::warn!("failed to parse completion response as a proposal, using fallback");
            fallback(language)
        }
    }
}

pub fn fallback(language: Language) -> NluProposal {
    NluProposal {
        reply_text: replies::please_repeat(language).to_string(),
        intent: DialogueIntent::NoOp,
        slots: PartialReservationSlots::default(),
    }
}

fn extract_json(response: &str) -> Option<Value> {
    // Try direct parse first
    if let Ok(value) = serde_json::from_str::<Value>(response) {
        return Some(value);
    }

    // Strip markdown code fences
    let trimmed = response.trim();
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    // Try to find a JSON object in the response
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&cleaned[start..=end]).ok()
}

fn proposal_from_value(value: &Value) -> Option<NluProposal> {
    let obj = value.as_object()?;

    let reply_text = text_field(obj, &["reply", "reply_text", "message", "message_to_customer", "response"]);
    let intent_label = text_field(obj, &["intent", "action", "next_step"]);
    if reply_text.is_none() && intent_label.is_none() {
        return None;
    }

    let slot_obj = ["slots", "booking", "reservation"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_object))
        .unwrap_or(obj);

    Some(NluProposal {
        reply_text: reply_text.unwrap_or_default(),
        intent: intent_label
            .map(|l| DialogueIntent::parse(&l))
            .unwrap_or_default(),
        slots: slots_from_object(slot_obj),
    })
}

fn slots_from_object(obj: &Map<String, Value>) -> PartialReservationSlots {
    PartialReservationSlots {
        date: text_field(obj, &["date", "data"]).and_then(|s| parse_date(&s)),
        time: text_field(obj, &["time", "ora", "orario"]).and_then(|s| parse_time(&s)),
        party_size: ["party_size", "people", "guests", "covers", "persone"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(party_size)),
        customer_name: text_field(obj, &["customer_name", "name", "nome"]),
        customer_email: text_field(obj, &["customer_email", "email"]),
    }
}

/// First non-placeholder string under any of `keys`.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !slots::is_placeholder(s))
        .map(str::to_string)
}

fn party_size(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    ["%H:%M:%S", "%H:%M", "%H.%M"]
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let json = r#"{"reply":"Per quante persone?","intent":"ask_party_size","slots":{"date":"2025-06-11","time":"20:00","party_size":null,"customer_name":"Marco","customer_email":null}}"#;
        let p = parse_proposal(json, Language::It);
        assert_eq!(p.intent, DialogueIntent::AskPartySize);
        assert_eq!(p.reply_text, "Per quante persone?");
        assert_eq!(p.slots.date, NaiveDate::from_ymd_opt(2025, 6, 11));
        assert_eq!(p.slots.time, NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(p.slots.customer_name.as_deref(), Some("Marco"));
        assert_eq!(p.slots.party_size, None);
    }

    #[test]
    fn test_parse_markdown_fenced_json() {
        let json = "```json\n{\"reply\":\"Ok\",\"intent\":\"finalize_booking\",\"slots\":{}}\n```";
        let p = parse_proposal(json, Language::En);
        assert_eq!(p.intent, DialogueIntent::FinalizeBooking);
        assert_eq!(p.reply_text, "Ok");
    }

    #[test]
    fn test_parse_embedded_json_and_flat_slots() {
        let raw = r#"Sure! {"message":"Done","intent":"book","people":"4","name":"null","date":"11/06/2025"} hope it helps"#;
        let p = parse_proposal(raw, Language::En);
        assert_eq!(p.intent, DialogueIntent::FinalizeBooking);
        assert_eq!(p.slots.party_size, Some(4));
        assert_eq!(p.slots.customer_name, None);
        assert_eq!(p.slots.date, NaiveDate::from_ymd_opt(2025, 6, 11));
    }

    #[test]
    fn test_parse_null_placeholders_are_absent() {
        let json = r#"{"reply":"Hi","intent":"no_op","slots":{"date":"null","time":"None","party_size":"null","customer_name":"","customer_email":"unknown"}}"#;
        let p = parse_proposal(json, Language::It);
        assert_eq!(p.slots, PartialReservationSlots::default());
    }

    #[test]
    fn test_parse_fallback_on_prose() {
        let raw = "I don't understand the format you want";
        let p = parse_proposal(raw, Language::En);
        assert_eq!(p, fallback(Language::En));
        assert_eq!(p.intent, DialogueIntent::NoOp);
        assert_eq!(p.reply_text, replies::please_repeat(Language::En));
        assert_eq!(p.slots, PartialReservationSlots::default());
    }

    #[test]
    fn test_parse_fallback_on_unknown_shape() {
        let expected = fallback(Language::It);
        assert_eq!(parse_proposal("[1, 2, 3]", Language::It), expected);
        assert_eq!(parse_proposal(r#"{"foo":"bar"}"#, Language::It), expected);
        assert_eq!(parse_proposal(r#"{"reply": 42}"#, Language::It), expected);
    }

    #[test]
    fn test_parse_bad_party_size_and_time() {
        let json = r#"{"reply":"Ok","intent":"ask_time","slots":{"party_size":-3,"time":"verso le otto"}}"#;
        let p = parse_proposal(json, Language::It);
        assert_eq!(p.slots.party_size, None);
        assert_eq!(p.slots.time, None);
    }
}
