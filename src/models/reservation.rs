use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Booking fields accumulated over the turns of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSlots {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub party_size: Option<u32>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

/// The fields one proposal supplies; `None` means "not mentioned this turn".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialReservationSlots {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub party_size: Option<u32>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Date,
    Time,
    PartySize,
    Name,
    Email,
}

impl ReservationSlots {
    /// First field a booking cannot go ahead without, checked date, time, name.
    pub fn first_missing_required(&self) -> Option<Slot> {
        if self.date.is_none() {
            Some(Slot::Date)
        } else if self.time.is_none() {
            Some(Slot::Time)
        } else if self.customer_name.is_none() {
            Some(Slot::Name)
        } else {
            None
        }
    }

    pub fn is_fully_known(&self) -> bool {
        self.first_missing_required().is_none() && self.customer_email.is_some()
    }
}
