use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;

use super::BookingBackend;
use crate::db::queries;
use crate::models::{
    Booking, BookingOutcome, BookingRejection, BookingRequest, BookingStatus, CancelRequest,
};

/// Local reservation book with a per-slot cover limit.
pub struct SqliteBookingBackend {
    db: Arc<Mutex<Connection>>,
    slot_capacity: u32,
}

impl SqliteBookingBackend {
    pub fn new(db: Arc<Mutex<Connection>>, slot_capacity: u32) -> Self {
        Self { db, slot_capacity }
    }

    fn create_blocking(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;

        // One active booking per caller per day: a second request on the same call moves it.
        let existing = match &request.caller_identifier {
            Some(phone) => queries::find_active_booking_for_phone(&db, phone, &request.date)?,
            None => None,
        };

        let booked = queries::covers_booked(
            &db,
            &request.date,
            &request.time,
            existing.as_ref().map(|b| b.id.as_str()),
        )?;
        let wanted = request.party_size.unwrap_or(1);
        if booked.saturating_add(wanted) > self.slot_capacity {
            tracing::info!(
                date = %request.date,
                time = %request.time,
                booked,
                wanted,
                "slot full"
            );
            return Ok(BookingOutcome::rejected(BookingRejection::SlotFull));
        }

        let status = if request.requires_confirmation {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        };
        let now = Utc::now().naive_utc();

        match existing {
            Some(mut booking) => {
                booking.customer_name = request.customer_name.clone();
                booking.customer_email = request.customer_email.clone();
                booking.party_size = request.party_size;
                booking.date = request.date;
                booking.time = request.time;
                booking.status = status;
                booking.updated_at = now;
                queries::update_booking(&db, &booking)?;
                tracing::info!(booking_id = %booking.id, "booking updated");
            }
            None => {
                let booking = Booking {
                    id: uuid::Uuid::new_v4().to_string(),
                    customer_phone: request.caller_identifier.clone(),
                    customer_name: request.customer_name.clone(),
                    customer_email: request.customer_email.clone(),
                    party_size: request.party_size,
                    date: request.date,
                    time: request.time,
                    status,
                    created_at: now,
                    updated_at: now,
                };
                queries::create_booking(&db, &booking)?;
                tracing::info!(booking_id = %booking.id, status = booking.status.as_str(), "booking created");
            }
        }

        Ok(BookingOutcome::accepted())
    }

    fn cancel_blocking(&self, request: &CancelRequest) -> anyhow::Result<BookingOutcome> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;

        let by_caller = match &request.caller_identifier {
            Some(phone) => queries::find_active_booking_for_phone(&db, phone, &request.date)?,
            None => None,
        };
        let booking = match by_caller {
            Some(b) => Some(b),
            None => queries::find_active_booking(
                &db,
                &request.date,
                request.time.as_ref(),
                request.customer_name.as_deref(),
            )?,
        };

        let Some(booking) = booking else {
            return Ok(BookingOutcome::rejected(BookingRejection::ReservationNotFound));
        };

        queries::update_booking_status(&db, &booking.id, &BookingStatus::Cancelled)?;
        tracing::info!(booking_id = %booking.id, "booking cancelled");
        Ok(BookingOutcome::accepted())
    }
}

#[async_trait]
impl BookingBackend for SqliteBookingBackend {
    async fn create(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome> {
        self.create_blocking(request)
    }

    async fn cancel(&self, request: &CancelRequest) -> anyhow::Result<BookingOutcome> {
        self.cancel_blocking(request)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{NaiveDate, NaiveTime};

    fn backend(capacity: u32) -> SqliteBookingBackend {
        SqliteBookingBackend::new(db::open_shared(":memory:").unwrap(), capacity)
    }

    fn request(name: &str, phone: Option<&str>, party: u32) -> BookingRequest {
        BookingRequest {
            customer_name: name.to_string(),
            party_size: Some(party),
            date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            caller_identifier: phone.map(str::to_string),
            customer_email: None,
            requires_confirmation: false,
        }
    }

    fn cancel(name: Option<&str>, phone: Option<&str>) -> CancelRequest {
        CancelRequest {
            customer_name: name.map(str::to_string),
            date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            time: None,
            caller_identifier: phone.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_within_capacity() {
        let b = backend(10);
        let outcome = b.create(&request("Marco", Some("+39111"), 4)).await.unwrap();
        assert_eq!(outcome, BookingOutcome::accepted());
    }

    #[tokio::test]
    async fn test_slot_full_when_over_capacity() {
        let b = backend(10);
        b.create(&request("Marco", Some("+39111"), 6)).await.unwrap();
        let outcome = b.create(&request("Giulia", Some("+39222"), 5)).await.unwrap();
        assert_eq!(outcome, BookingOutcome::rejected(BookingRejection::SlotFull));
    }

    #[tokio::test]
    async fn test_same_caller_moves_existing_booking() {
        let b = backend(10);
        b.create(&request("Marco", Some("+39111"), 6)).await.unwrap();
        // Replacing 6 covers with 8 fits because the old booking is not counted twice
        let outcome = b.create(&request("Marco", Some("+39111"), 8)).await.unwrap();
        assert!(outcome.success);

        let db = b.db.lock().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let time = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert_eq!(queries::covers_booked(&db, &date, &time, None).unwrap(), 8);
    }

    #[tokio::test]
    async fn test_large_group_is_pending() {
        let b = backend(40);
        let mut req = request("Marco", Some("+39111"), 12);
        req.requires_confirmation = true;
        b.create(&req).await.unwrap();

        let db = b.db.lock().unwrap();
        let found = queries::find_active_booking_for_phone(&db, "+39111", &req.date)
            .unwrap()
            .unwrap();
        assert_eq!(found.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancel_by_name_and_not_found() {
        let b = backend(40);
        b.create(&request("Marco", None, 2)).await.unwrap();

        let missing = b.cancel(&cancel(Some("Giulia"), None)).await.unwrap();
        assert_eq!(
            missing,
            BookingOutcome::rejected(BookingRejection::ReservationNotFound)
        );

        let done = b.cancel(&cancel(Some("marco"), None)).await.unwrap();
        assert!(done.success);

        let again = b.cancel(&cancel(Some("Marco"), None)).await.unwrap();
        assert!(!again.success);
    }

    #[tokio::test]
    async fn test_cancel_by_caller() {
        let b = backend(40);
        b.create(&request("Marco", Some("+39111"), 2)).await.unwrap();
        let done = b.cancel(&cancel(None, Some("+39111"))).await.unwrap();
        assert!(done.success);
    }
}
