//! Email addresses dictated over the phone: extraction from recognized speech, cleanup, and a
//! spelled-out rendering the caller can check by ear.
//!
//! Italian renderings say "doppia" before a doubled letter in the local part ("anna" is read
//! "a, doppia n, a"), which is how Italians dictate addresses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Language;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("valid email regex")
});

static EMAIL_EXACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}$")
        .expect("valid exact email regex")
});

static SPOKEN_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:\bat\b|\bchiocciola\b|@)\s*").expect("valid spoken at regex")
});

static SPOKEN_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:dot|punto)\s+").expect("valid spoken dot regex"));

/// Providers whose domain is spoken as a word instead of being spelled.
const KNOWN_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "hotmail.com",
    "hotmail.it",
    "outlook.com",
    "outlook.it",
    "live.com",
    "live.it",
    "yahoo.com",
    "yahoo.it",
    "icloud.com",
    "libero.it",
    "virgilio.it",
    "alice.it",
    "tiscali.it",
    "tim.it",
    "fastwebnet.it",
];

/// First email address found in `text`, with spoken "at"/"dot" forms collapsed first.
pub fn extract(text: &str) -> Option<String> {
    if let Some(m) = EMAIL.find(text) {
        return Some(m.as_str().to_string());
    }
    let collapsed = SPOKEN_DOT.replace_all(text, ".");
    let collapsed = collapse_spoken_at(&collapsed);
    EMAIL.find(&collapsed).map(|m| m.as_str().to_string())
}

/// Removes whitespace a pause in dictation may leave inside the address and lowercases it.
pub fn sanitize(email: &str) -> String {
    email
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_matches(|c: char| c == '.' || c == ',')
        .to_lowercase()
}

pub fn is_valid(email: &str) -> bool {
    EMAIL_EXACT.is_match(email)
}

/// Sanitized address when `raw` holds a well-formed one.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned = sanitize(raw);
    if is_valid(&cleaned) {
        return Some(cleaned);
    }
    extract(raw).map(|e| sanitize(&e)).filter(|e| is_valid(e))
}

/// Spoken form of an address for read-back.
pub fn render(email: &str, language: Language) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return spell(email, language).join(", ");
    };

    let mut parts = spell(local, language);
    parts.push(at_word(language).to_string());
    if KNOWN_DOMAINS.contains(&domain) {
        parts.push(domain.to_string());
    } else {
        parts.extend(spell(domain, language));
    }
    parts.join(", ")
}

fn spell(text: &str, language: Language) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let doubled = language == Language::It
            && c.is_ascii_alphabetic()
            && chars.get(i + 1) == Some(&c);
        if doubled {
            parts.push(format!("doppia {c}"));
            i += 2;
            continue;
        }
        parts.push(symbol_word(c, language));
        i += 1;
    }
    parts
}

fn symbol_word(c: char, language: Language) -> String {
    let word = match (c, language) {
        ('.', Language::It) => "punto",
        ('.', Language::En) => "dot",
        ('_', Language::It) => "trattino basso",
        ('_', Language::En) => "underscore",
        ('-', Language::It) => "trattino",
        ('-', Language::En) => "dash",
        ('+', Language::It) => "più",
        ('+', Language::En) => "plus",
        _ => return c.to_string(),
    };
    word.to_string()
}

fn at_word(language: Language) -> &'static str {
    match language {
        Language::It => "chiocciola",
        Language::En => "at",
    }
}

fn collapse_spoken_at(text: &str) -> String {
    // Only the last "at" can be the separator; earlier ones are ordinary words
    // ("a table at 8, my email is mario at gmail.com").
    let matches: Vec<_> = SPOKEN_AT.find_iter(text).collect();
    match matches.last() {
        Some(m) => format!("{}@{}", &text[..m.start()], &text[m.end()..]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_written_address() {
        assert_eq!(
            extract("my email is Marco.Rossi@Example.org thanks"),
            Some("Marco.Rossi@Example.org".to_string())
        );
    }

    #[test]
    fn test_extract_spoken_address() {
        assert_eq!(
            extract("it's mirko13 at gmail dot com"),
            Some("mirko13@gmail.com".to_string())
        );
        assert_eq!(
            extract("la mia mail è giulia punto bianchi chiocciola libero punto it"),
            Some("giulia.bianchi@libero.it".to_string())
        );
    }

    #[test]
    fn test_extract_ignores_earlier_at() {
        assert_eq!(
            extract("a table at 8, email mario at gmail dot com"),
            Some("mario@gmail.com".to_string())
        );
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract("no thanks, I don't want to give it"), None);
        assert_eq!(extract("a table at 8 please"), None);
    }

    #[test]
    fn test_sanitize_removes_pauses() {
        assert_eq!(sanitize("mirko 13@gmail. com"), "mirko13@gmail.com");
        assert_eq!(sanitize(" Anna@Libero.it."), "anna@libero.it");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert_eq!(normalize("mirko 13 @ gmail.com"), Some("mirko13@gmail.com".to_string()));
        assert_eq!(normalize("not an email"), None);
        assert_eq!(normalize("mirko@gmail"), None);
    }

    #[test]
    fn test_render_known_domain_as_word() {
        let email = sanitize(&extract("it's mirko13 at gmail dot com").unwrap());
        let spoken = render(&email, Language::En);
        assert_eq!(spoken, "m, i, r, k, o, 1, 3, at, gmail.com");

        let mut rest = spoken.as_str();
        for c in "mirko13".chars() {
            let pos = rest.find(c).unwrap();
            rest = &rest[pos + 1..];
        }
        assert!(!spoken.contains("g, m, a, i, l"));
    }

    #[test]
    fn test_render_unknown_domain_spelled() {
        let spoken = render("al@bo.eu", Language::It);
        assert_eq!(spoken, "a, l, chiocciola, b, o, punto, e, u");
    }

    #[test]
    fn test_render_italian_double_letters() {
        assert_eq!(render("anna@gmail.com", Language::It), "a, doppia n, a, chiocciola, gmail.com");
        assert_eq!(render("anna@gmail.com", Language::En), "a, n, n, a, at, gmail.com");
    }

    #[test]
    fn test_render_symbols() {
        assert_eq!(
            render("a.b_c@gmail.com", Language::En),
            "a, dot, b, underscore, c, at, gmail.com"
        );
    }
}
