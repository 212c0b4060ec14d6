use crate::models::{PartialReservationSlots, ReservationSlots};

/// Textual stand-ins for "no value" that models emit instead of a JSON null.
const PLACEHOLDERS: &[&str] = &["null", "none", "nil", "undefined", "unknown", "n/a", "-"];

pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || PLACEHOLDERS.iter().any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// Folds one proposal into the known slots. A supplied value replaces the previous one,
/// anything else keeps it; a known field never becomes unknown.
pub fn merge(previous: &ReservationSlots, proposed: &PartialReservationSlots) -> ReservationSlots {
    ReservationSlots {
        date: proposed.date.or(previous.date),
        time: proposed.time.or(previous.time),
        party_size: proposed.party_size.filter(|n| *n > 0).or(previous.party_size),
        customer_name: known_text(&proposed.customer_name).or_else(|| previous.customer_name.clone()),
        customer_email: known_text(&proposed.customer_email)
            .or_else(|| previous.customer_email.clone()),
    }
}

/// Field-wise union of two proposals, `later` winning where both supply a value.
pub fn overlay(
    earlier: &PartialReservationSlots,
    later: &PartialReservationSlots,
) -> PartialReservationSlots {
    PartialReservationSlots {
        date: later.date.or(earlier.date),
        time: later.time.or(earlier.time),
        party_size: later.party_size.filter(|n| *n > 0).or(earlier.party_size),
        customer_name: known_text(&later.customer_name).or_else(|| earlier.customer_name.clone()),
        customer_email: known_text(&later.customer_email)
            .or_else(|| earlier.customer_email.clone()),
    }
}

fn known_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !is_placeholder(v))
        .map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_merge_keeps_previous_values() {
        let previous = ReservationSlots {
            date: Some(date("2025-06-11")),
            party_size: Some(4),
            customer_name: Some("Marco".to_string()),
            ..Default::default()
        };
        let proposed = PartialReservationSlots {
            time: NaiveTime::from_hms_opt(20, 0, 0),
            ..Default::default()
        };

        let merged = merge(&previous, &proposed);
        assert_eq!(merged.date, Some(date("2025-06-11")));
        assert_eq!(merged.time, NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(merged.party_size, Some(4));
        assert_eq!(merged.customer_name.as_deref(), Some("Marco"));
    }

    #[test]
    fn test_merge_overwrites_with_new_value() {
        let previous = ReservationSlots {
            party_size: Some(4),
            ..Default::default()
        };
        let proposed = PartialReservationSlots {
            party_size: Some(6),
            ..Default::default()
        };
        assert_eq!(merge(&previous, &proposed).party_size, Some(6));
    }

    #[test]
    fn test_merge_treats_null_text_as_absent() {
        let previous = ReservationSlots {
            customer_name: Some("Marco".to_string()),
            customer_email: Some("marco@gmail.com".to_string()),
            ..Default::default()
        };
        let proposed = PartialReservationSlots {
            customer_name: Some("null".to_string()),
            customer_email: Some("  ".to_string()),
            party_size: Some(0),
            ..Default::default()
        };
        assert_eq!(merge(&previous, &proposed), previous);
    }

    fn arb_partial() -> impl Strategy<Value = PartialReservationSlots> {
        (
            proptest::option::of(0u32..400),
            proptest::option::of(0u32..24),
            proptest::option::of(1u32..60),
            proptest::option::of(prop_oneof![
                Just("Marco".to_string()),
                Just("Giulia".to_string()),
                Just("null".to_string()),
            ]),
            proptest::option::of(prop_oneof![
                Just("a@b.it".to_string()),
                Just("c@d.com".to_string()),
            ]),
        )
            .prop_map(|(day, hour, party, name, email)| PartialReservationSlots {
                date: day.and_then(|d| date("2025-01-01").checked_add_days(chrono::Days::new(d as u64))),
                time: hour.and_then(|h| NaiveTime::from_hms_opt(h, 0, 0)),
                party_size: party,
                customer_name: name,
                customer_email: email,
            })
    }

    proptest! {
        #[test]
        fn prop_merge_is_associative(p1 in arb_partial(), p2 in arb_partial()) {
            let start = ReservationSlots::default();
            let stepwise = merge(&merge(&start, &p1), &p2);
            let at_once = merge(&start, &overlay(&p1, &p2));
            prop_assert_eq!(stepwise, at_once);
        }

        #[test]
        fn prop_merge_is_idempotent(p in arb_partial(), base in arb_partial()) {
            let start = merge(&ReservationSlots::default(), &base);
            let once = merge(&start, &p);
            let twice = merge(&once, &p);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_merge_never_forgets(p in arb_partial(), base in arb_partial()) {
            let start = merge(&ReservationSlots::default(), &base);
            let merged = merge(&start, &p);
            prop_assert!(start.date.is_none() || merged.date.is_some());
            prop_assert!(start.time.is_none() || merged.time.is_some());
            prop_assert!(start.party_size.is_none() || merged.party_size.is_some());
            prop_assert!(start.customer_name.is_none() || merged.customer_name.is_some());
            prop_assert!(start.customer_email.is_none() || merged.customer_email.is_some());
        }
    }
}
