//! Fixed phrases spoken when the reply cannot come from the model.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::models::{DialogueIntent, Language, ReservationSlots};

const IT_WEEKDAYS: [&str; 7] = [
    "lunedì",
    "martedì",
    "mercoledì",
    "giovedì",
    "venerdì",
    "sabato",
    "domenica",
];

const IT_MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

pub fn greeting(language: Language, restaurant: &str) -> String {
    match language {
        Language::It => format!("Buongiorno, {restaurant}. Come posso aiutarla?"),
        Language::En => format!("Hello, this is {restaurant}. How can I help you?"),
    }
}

pub fn reprompt(language: Language) -> &'static str {
    match language {
        Language::It => "Mi scusi, non ho sentito. Può ripetere?",
        Language::En => "Sorry, I didn't hear you. Could you say that again?",
    }
}

pub fn please_repeat(language: Language) -> &'static str {
    match language {
        Language::It => "Mi scusi, non ho capito bene. Può ripetere per favore?",
        Language::En => "Sorry, I didn't quite get that. Could you repeat, please?",
    }
}

pub fn apology(language: Language) -> &'static str {
    match language {
        Language::It => "Mi scusi, c'è stato un problema. Possiamo riprovare?",
        Language::En => "I'm sorry, something went wrong. Shall we try again?",
    }
}

pub fn unavailable(language: Language) -> &'static str {
    match language {
        Language::It => {
            "Si è verificato un errore del server. Le chiediamo di richiamare più tardi."
        }
        Language::En => "We're having a technical problem. Please call again later.",
    }
}

pub fn goodbye(language: Language) -> &'static str {
    match language {
        Language::It => "Grazie per aver chiamato. Arrivederci!",
        Language::En => "Thank you for calling. Goodbye!",
    }
}

pub fn question_for(intent: DialogueIntent, language: Language) -> Option<&'static str> {
    let text = match (intent, language) {
        (DialogueIntent::AskDate, Language::It) => "Per quale giorno desidera prenotare?",
        (DialogueIntent::AskDate, Language::En) => "For which day would you like to book?",
        (DialogueIntent::AskTime, Language::It) => "A che ora preferisce?",
        (DialogueIntent::AskTime, Language::En) => "What time would you prefer?",
        (DialogueIntent::AskPartySize, Language::It) => "Per quante persone?",
        (DialogueIntent::AskPartySize, Language::En) => "For how many people?",
        (DialogueIntent::AskName, Language::It) => "A che nome registro la prenotazione?",
        (DialogueIntent::AskName, Language::En) => "What name should I put the booking under?",
        (DialogueIntent::AskEmail, Language::It) => {
            "Mi lascia un indirizzo email per la conferma? Se preferisce, possiamo farne a meno."
        }
        (DialogueIntent::AskEmail, Language::En) => {
            "Could I have an email address for the confirmation? It's fine if you'd rather not."
        }
        _ => return None,
    };
    Some(text)
}

pub fn slot_full(language: Language, slots: &ReservationSlots) -> String {
    let when = when(language, slots);
    match language {
        Language::It => format!(
            "Mi dispiace, {when} siamo al completo. Le andrebbe bene un altro orario?"
        ),
        Language::En => format!(
            "I'm sorry, we're fully booked {when}. Would another time work for you?"
        ),
    }
}

pub fn booking_confirmed(language: Language, slots: &ReservationSlots) -> String {
    let when = when(language, slots);
    let name = slots.customer_name.as_deref().unwrap_or_default();
    match (language, slots.party_size) {
        (Language::It, Some(n)) => format!(
            "Perfetto {name}, ho prenotato un tavolo per {n} {when}. A presto!"
        ),
        (Language::It, None) => format!("Perfetto {name}, ho prenotato un tavolo {when}. A presto!"),
        (Language::En, Some(n)) => format!(
            "All set, {name}: a table for {n} {when}. See you soon!"
        ),
        (Language::En, None) => format!("All set, {name}: your table is booked {when}. See you soon!"),
    }
}

pub fn pending_confirmation(language: Language, slots: &ReservationSlots) -> String {
    let when = when(language, slots);
    let party = slots.party_size.unwrap_or_default();
    match language {
        Language::It => format!(
            "Grazie. Ho registrato la richiesta per {party} persone {when}. Essendo un gruppo numeroso, la prenotazione è in attesa di conferma da parte del ristorante: la ricontatteremo al più presto."
        ),
        Language::En => format!(
            "Thank you. I've registered a request for {party} people {when}. As it's a large group, the booking is pending confirmation from the restaurant, and we'll get back to you shortly."
        ),
    }
}

/// `spoken_email` is the restaurant address already rendered for speech.
pub fn private_event(language: Language, spoken_email: Option<&str>) -> String {
    match (language, spoken_email) {
        (Language::It, Some(email)) => format!(
            "Per gruppi così numerosi organizziamo un evento privato. Ho avvisato il titolare: la preghiamo di scriverci a {email} con i dettagli. Grazie e arrivederci!"
        ),
        (Language::It, None) => "Per gruppi così numerosi organizziamo un evento privato. Ho avvisato il titolare, che la ricontatterà per i dettagli. Grazie e arrivederci!".to_string(),
        (Language::En, Some(email)) => format!(
            "For a group this size we organize a private event. I've let the owner know; please email us at {email} with the details. Thank you, goodbye!"
        ),
        (Language::En, None) => "For a group this size we organize a private event. I've let the owner know and they will contact you about the details. Thank you, goodbye!".to_string(),
    }
}

pub fn cancelled(language: Language, date: NaiveDate) -> String {
    let day = spoken_date(date, language);
    match language {
        Language::It => format!("Ho cancellato la prenotazione di {day}. Arrivederci!"),
        Language::En => format!("Your booking for {day} is cancelled. Goodbye!"),
    }
}

pub fn cancel_not_found(language: Language) -> &'static str {
    match language {
        Language::It => {
            "Non trovo nessuna prenotazione per quel giorno. Può ripetermi la data e il nome?"
        }
        Language::En => {
            "I can't find a booking for that day. Could you tell me the date and name again?"
        }
    }
}

pub fn spoken_date(date: NaiveDate, language: Language) -> String {
    match language {
        Language::It => format!(
            "{} {} {}",
            IT_WEEKDAYS[date.weekday().num_days_from_monday() as usize],
            date.day(),
            IT_MONTHS[date.month0() as usize],
        ),
        Language::En => date.format("%A, %B %-d").to_string(),
    }
}

pub fn spoken_time(time: NaiveTime, language: Language) -> String {
    match language {
        Language::It => format!("{}:{:02}", time.hour(), time.minute()),
        Language::En => {
            let hour12 = match time.hour() % 12 {
                0 => 12,
                h => h,
            };
            let suffix = if time.hour() < 12 { "am" } else { "pm" };
            if time.minute() == 0 {
                format!("{hour12} {suffix}")
            } else {
                format!("{hour12}:{:02} {suffix}", time.minute())
            }
        }
    }
}

fn when(language: Language, slots: &ReservationSlots) -> String {
    let mut parts = Vec::new();
    if let Some(date) = slots.date {
        parts.push(match language {
            Language::It => spoken_date(date, language),
            Language::En => format!("on {}", spoken_date(date, language)),
        });
    }
    if let Some(time) = slots.time {
        parts.push(match language {
            Language::It => format!("alle {}", spoken_time(time, language)),
            Language::En => format!("at {}", spoken_time(time, language)),
        });
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> ReservationSlots {
        ReservationSlots {
            date: NaiveDate::from_ymd_opt(2025, 6, 14),
            time: NaiveTime::from_hms_opt(20, 30, 0),
            party_size: Some(4),
            customer_name: Some("Marco".to_string()),
            customer_email: None,
        }
    }

    #[test]
    fn test_italian_phrases_use_formal_register() {
        let fixed = [
            greeting(Language::It, "Da Giulia"),
            reprompt(Language::It).to_string(),
            please_repeat(Language::It).to_string(),
            apology(Language::It).to_string(),
            unavailable(Language::It).to_string(),
            goodbye(Language::It).to_string(),
            cancel_not_found(Language::It).to_string(),
            slot_full(Language::It, &slots()),
            pending_confirmation(Language::It, &slots()),
        ];
        for text in &fixed {
            let lower = text.to_lowercase();
            let words: Vec<&str> = lower
                .split(|c: char| !c.is_alphabetic())
                .filter(|w| !w.is_empty())
                .collect();
            for informal in ["ti", "tu", "puoi", "vuoi", "tuo", "tua"] {
                assert!(!words.contains(&informal), "informal {informal:?} in {text:?}");
            }
        }
        assert!(unavailable(Language::It).contains("Le chiediamo"));
    }

    #[test]
    fn test_spoken_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        assert_eq!(spoken_date(date, Language::It), "sabato 14 giugno");
        assert_eq!(spoken_date(date, Language::En), "Saturday, June 14");
    }

    #[test]
    fn test_spoken_time() {
        let t = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert_eq!(spoken_time(t, Language::En), "8 pm");
        assert_eq!(spoken_time(t, Language::It), "20:00");
        let t = NaiveTime::from_hms_opt(12, 15, 0).unwrap();
        assert_eq!(spoken_time(t, Language::En), "12:15 pm");
    }

    #[test]
    fn test_confirmation_mentions_details() {
        let text = booking_confirmed(Language::It, &slots());
        assert!(text.contains("per 4"));
        assert!(text.contains("sabato 14 giugno alle 20:30"));
    }

    #[test]
    fn test_pending_confirmation_says_pending() {
        assert!(pending_confirmation(Language::En, &slots()).contains("pending confirmation"));
        assert!(pending_confirmation(Language::It, &slots()).contains("in attesa di conferma"));
    }

    #[test]
    fn test_every_ask_intent_has_a_question() {
        for intent in [
            DialogueIntent::AskDate,
            DialogueIntent::AskTime,
            DialogueIntent::AskPartySize,
            DialogueIntent::AskName,
            DialogueIntent::AskEmail,
        ] {
            assert!(question_for(intent, Language::It).is_some());
            assert!(question_for(intent, Language::En).is_some());
        }
        assert!(question_for(DialogueIntent::NoOp, Language::It).is_none());
    }
}
