//! Resolves spoken date and time references ("tomorrow", "sabato prossimo", "a pranzo",
//! "at 8") against a reference date.
//!
//! Utterances are scanned newest first, so a later correction ("no, Saturday") wins over an
//! earlier mention. Nothing here fails: no match is a normal outcome.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TimeDefaults;

struct Occasion {
    phrases: &'static [&'static str],
    month: u32,
    day: u32,
}

// Order matters: "christmas eve" must be tried before "christmas", "notte di capodanno"
// before "capodanno".
const OCCASIONS: &[Occasion] = &[
    Occasion {
        phrases: &["christmas eve", "vigilia di natale"],
        month: 12,
        day: 24,
    },
    Occasion {
        phrases: &[
            "new year s eve",
            "new years eve",
            "san silvestro",
            "notte di capodanno",
            "cenone di capodanno",
            "ultimo dell anno",
        ],
        month: 12,
        day: 31,
    },
    Occasion {
        phrases: &["new year s day", "new years day", "capodanno", "primo dell anno"],
        month: 1,
        day: 1,
    },
    Occasion {
        phrases: &["boxing day", "santo stefano"],
        month: 12,
        day: 26,
    },
    Occasion {
        phrases: &["christmas", "natale"],
        month: 12,
        day: 25,
    },
    Occasion {
        phrases: &["valentine s day", "valentines day", "valentine", "san valentino"],
        month: 2,
        day: 14,
    },
    Occasion {
        phrases: &["epiphany", "epifania", "befana"],
        month: 1,
        day: 6,
    },
    Occasion {
        phrases: &["women s day", "womens day", "festa della donna"],
        month: 3,
        day: 8,
    },
    Occasion {
        phrases: &["liberation day", "festa della liberazione"],
        month: 4,
        day: 25,
    },
    Occasion {
        phrases: &["festa dei lavoratori", "primo maggio"],
        month: 5,
        day: 1,
    },
    Occasion {
        phrases: &["festa della repubblica"],
        month: 6,
        day: 2,
    },
    Occasion {
        phrases: &["ferragosto"],
        month: 8,
        day: 15,
    },
    Occasion {
        phrases: &["halloween"],
        month: 10,
        day: 31,
    },
    Occasion {
        phrases: &["all saints day", "ognissanti"],
        month: 11,
        day: 1,
    },
];

const DAY_AFTER_TOMORROW: &[&str] = &["day after tomorrow", "dopodomani", "dopo domani"];
const TOMORROW: &[&str] = &["tomorrow", "domani"];
const TODAY: &[&str] = &[
    "today",
    "tonight",
    "this evening",
    "oggi",
    "stasera",
    "stanotte",
    "questa sera",
];

const WEEKDAYS: &[(Weekday, &[&str])] = &[
    (Weekday::Mon, &["monday", "lunedi"]),
    (Weekday::Tue, &["tuesday", "martedi"]),
    (Weekday::Wed, &["wednesday", "mercoledi"]),
    (Weekday::Thu, &["thursday", "giovedi"]),
    (Weekday::Fri, &["friday", "venerdi"]),
    (Weekday::Sat, &["saturday", "sabato"]),
    (Weekday::Sun, &["sunday", "domenica"]),
];

/// Words after which a weekday is someone's name ("sono Domenica", "my name is Sabato").
const NAME_CUES: &[&str] = &[
    "sono",
    "chiamo",
    "nome e",
    "signor",
    "signora",
    "i m",
    "i am",
    "name is",
    "this is",
    "mr",
    "mrs",
    "ms",
];

const NEXT_WEEK: &[&str] = &["next week", "settimana prossima", "prossima settimana"];
const WEEKEND: &[&str] = &["weekend", "week end", "fine settimana"];

const MORNING: &[&str] = &["morning", "breakfast", "mattina", "mattino", "colazione"];
const LUNCH: &[&str] = &[
    "lunch",
    "brunch",
    "midday",
    "noon",
    "pranzo",
    "mezzogiorno",
];
const AFTERNOON: &[&str] = &["afternoon", "pomeriggio"];
const EVENING: &[&str] = &[
    "evening",
    "night",
    "tonight",
    "dinner",
    "sera",
    "stasera",
    "serata",
    "cena",
    "notte",
    "stanotte",
];
const LATE: &[&str] = &[
    "latest",
    "very late",
    "as late as possible",
    "piu tardi possibile",
    "il piu tardi",
    "molto tardi",
    "tardissimo",
];

const HOUR_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("una", 1),
    ("uno", 1),
    ("due", 2),
    ("tre", 3),
    ("quattro", 4),
    ("cinque", 5),
    ("sei", 6),
    ("sette", 7),
    ("otto", 8),
    ("nove", 9),
    ("dieci", 10),
    ("undici", 11),
    ("dodici", 12),
];

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3])[:.]([0-5]\d)\s*(am\b|pm\b|a\.m\.|p\.m\.)?")
        .expect("valid clock time regex")
});

static MERIDIEM_HOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(1[0-2]|0?[1-9])\s*(am\b|pm\b|a\.m\.|p\.m\.)").expect("valid meridiem regex")
});

static ANCHORED_HOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:at|around|about|alle|dalle|verso le|per le|ore)\s+(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|una|uno|due|tre|quattro|cinque|sei|sette|otto|nove|dieci|undici|dodici)\b(?:\s+(e mezza|e mezzo|e trenta|and a half|thirty|e un quarto|e quindici|fifteen)\b)?",
    )
    .expect("valid anchored hour regex")
});

static OCLOCK_HOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+o'?\s?clock\b",
    )
    .expect("valid o'clock regex")
});

/// Date for the caller's request, or `None` when no inference is available.
///
/// An expression in the latest utterance wins. Otherwise a supplied date is used, rolled forward
/// a year at a time until it is no longer in the past, so a correction the caller spells out
/// beats an older relative expression. Earlier utterances are the last resort.
pub fn resolve(history: &[String], today: NaiveDate, supplied: Option<NaiveDate>) -> Option<NaiveDate> {
    history
        .last()
        .and_then(|latest| date_from_utterance(latest, today))
        .or_else(|| supplied.map(|d| roll_forward(d, today)))
        .or_else(|| resolve_date(history, today))
}

/// Date inferred from the utterances alone.
pub fn resolve_date(history: &[String], today: NaiveDate) -> Option<NaiveDate> {
    history
        .iter()
        .rev()
        .find_map(|utterance| date_from_utterance(utterance, today))
}

/// Moves a date forward by whole years until it is on or after `today`.
pub fn roll_forward(date: NaiveDate, today: NaiveDate) -> NaiveDate {
    let mut rolled = date;
    while rolled < today {
        let year = rolled.year() + 1;
        rolled = NaiveDate::from_ymd_opt(year, rolled.month(), rolled.day())
            .or_else(|| NaiveDate::from_ymd_opt(year, rolled.month(), 28))
            .unwrap_or(today);
    }
    rolled
}

/// Time implied by the utterances when none was stated explicitly to the model.
pub fn infer_time(history: &[String], defaults: &TimeDefaults) -> Option<NaiveTime> {
    history
        .iter()
        .rev()
        .find_map(|utterance| time_from_utterance(utterance, defaults))
}

fn date_from_utterance(utterance: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = normalize(utterance);

    occasion(&text, today)
        .or_else(|| relative_day(&text, today))
        .or_else(|| weekday(&text, today))
        .or_else(|| weekend(&text, today))
}

fn occasion(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    OCCASIONS
        .iter()
        .find(|o| has_any(text, o.phrases))
        .and_then(|o| NaiveDate::from_ymd_opt(today.year(), o.month, o.day))
}

fn relative_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let offset = if has_any(text, DAY_AFTER_TOMORROW) {
        2
    } else if has_any(text, TOMORROW) {
        1
    } else if has_any(text, TODAY) {
        0
    } else {
        return None;
    };
    Some(today + Duration::days(offset))
}

fn weekday(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (target, name) = WEEKDAYS
        .iter()
        .flat_map(|(day, names)| names.iter().map(move |n| (*day, *n)))
        .flat_map(|(day, name)| {
            let needle = format!(" {name} ");
            text.match_indices(&needle)
                .map(|(pos, _)| pos)
                .filter(|pos| !follows_name_cue(&text[..=*pos]))
                .map(|pos| (pos, day, name))
                .collect::<Vec<_>>()
        })
        .min_by_key(|(pos, _, _)| *pos)
        .map(|(_, day, name)| (day, name))?;

    let is_next = has_any(text, NEXT_WEEK)
        || [
            format!("next {name}"),
            format!("{name} prossimo"),
            format!("{name} prossima"),
            format!("prossimo {name}"),
            format!("prossima {name}"),
        ]
        .iter()
        .any(|p| has_phrase(text, p));

    if is_next {
        return (7..=13)
            .map(|d| today + Duration::days(d))
            .find(|date| date.weekday() == target);
    }

    let explicit_this = [
        format!("this {name}"),
        format!("questo {name}"),
        format!("questa {name}"),
    ]
    .iter()
    .any(|p| has_phrase(text, p));

    let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 && !explicit_this { 7 } else { ahead };
    Some(today + Duration::days(ahead as i64))
}

fn follows_name_cue(prefix: &str) -> bool {
    NAME_CUES.iter().any(|cue| prefix.ends_with(&format!(" {cue} ")))
}

fn weekend(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if !has_any(text, WEEKEND) {
        return None;
    }
    let ahead = (Weekday::Sat.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let saturday = today + Duration::days(ahead as i64);
    if has_any(text, &["sunday", "domenica"]) {
        Some(saturday + Duration::days(1))
    } else {
        Some(saturday)
    }
}

fn time_from_utterance(utterance: &str, defaults: &TimeDefaults) -> Option<NaiveTime> {
    let lower = utterance.to_lowercase();
    let text = normalize(utterance);

    if let Some((hour, minute, meridiem)) = explicit_hour(&lower) {
        let hour = qualify_hour(hour, meridiem, &text, defaults);
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if has_any(&text, LATE) {
        Some(defaults.late)
    } else if has_any(&text, LUNCH) {
        Some(defaults.lunch)
    } else if has_any(&text, EVENING) {
        Some(defaults.evening)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Meridiem {
    Am,
    Pm,
}

fn explicit_hour(lower: &str) -> Option<(u32, u32, Option<Meridiem>)> {
    if let Some(caps) = CLOCK_TIME.captures(lower) {
        let hour = caps.get(1)?.as_str().parse().ok()?;
        let minute = caps.get(2)?.as_str().parse().ok()?;
        return Some((hour, minute, caps.get(3).map(|m| meridiem(m.as_str()))));
    }
    if let Some(caps) = MERIDIEM_HOUR.captures(lower) {
        let hour = caps.get(1)?.as_str().parse().ok()?;
        return Some((hour, 0, caps.get(2).map(|m| meridiem(m.as_str()))));
    }
    if let Some(caps) = ANCHORED_HOUR.captures(lower) {
        let hour = hour_value(caps.get(1)?.as_str()).filter(|h| *h <= 23)?;
        let minute = caps.get(2).map(|m| fraction_minutes(m.as_str())).unwrap_or(0);
        return Some((hour, minute, None));
    }
    OCLOCK_HOUR
        .captures(lower)
        .and_then(|caps| hour_value(caps.get(1)?.as_str()))
        .filter(|h| *h <= 23)
        .map(|h| (h, 0, None))
}

fn fraction_minutes(s: &str) -> u32 {
    match s {
        "e un quarto" | "e quindici" | "fifteen" => 15,
        _ => 30,
    }
}

fn meridiem(s: &str) -> Meridiem {
    if s.starts_with('p') {
        Meridiem::Pm
    } else {
        Meridiem::Am
    }
}

fn hour_value(token: &str) -> Option<u32> {
    token.parse().ok().or_else(|| {
        HOUR_WORDS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, h)| *h)
    })
}

fn qualify_hour(hour: u32, meridiem: Option<Meridiem>, text: &str, defaults: &TimeDefaults) -> u32 {
    match meridiem {
        Some(Meridiem::Pm) if hour < 12 => return hour + 12,
        Some(Meridiem::Am) if hour == 12 => return 0,
        Some(_) => return hour,
        None => {}
    }
    if hour == 0 || hour >= 13 {
        return hour;
    }

    if has_any(text, MORNING) {
        hour
    } else if has_any(text, LUNCH) {
        if hour <= 4 {
            hour + 12
        } else {
            hour
        }
    } else if has_any(text, AFTERNOON) || has_any(text, EVENING) {
        if hour < 12 {
            hour + 12
        } else {
            hour
        }
    } else if defaults.assume_pm_for_bare_hours && hour <= 11 {
        hour + 12
    } else {
        hour
    }
}

/// Lowercases, folds accents and replaces punctuation with spaces, padding the result with a
/// leading and trailing space so phrases can be matched on word boundaries.
fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'á' => 'a',
            'è' | 'é' => 'e',
            'ì' | 'í' => 'i',
            'ò' | 'ó' => 'o',
            'ù' | 'ú' => 'u',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect();
    let words: Vec<&str> = folded.split_whitespace().collect();
    format!(" {} ", words.join(" "))
}

fn has_phrase(text: &str, phrase: &str) -> bool {
    text.contains(&format!(" {phrase} "))
}

fn has_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| has_phrase(text, p))
}
