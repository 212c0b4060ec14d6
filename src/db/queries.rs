use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, customer_phone, customer_name, customer_email, party_size, date, time, status, created_at, updated_at";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_phone, customer_name, customer_email, party_size, date, time, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.customer_phone,
            booking.customer_name,
            booking.customer_email,
            booking.party_size,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time.format(TIME_FORMAT).to_string(),
            booking.status.as_str(),
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET customer_name = ?1, customer_email = ?2, party_size = ?3, date = ?4, time = ?5, status = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            booking.customer_name,
            booking.customer_email,
            booking.party_size,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time.format(TIME_FORMAT).to_string(),
            booking.status.as_str(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: &BookingStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let booking = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    booking.transpose()
}

/// The caller's active booking on `date`, if any.
pub fn find_active_booking_for_phone(
    conn: &Connection,
    phone: &str,
    date: &NaiveDate,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE customer_phone = ?1 AND date = ?2 AND status != 'cancelled'
         ORDER BY created_at DESC LIMIT 1"
    );
    let booking = conn
        .query_row(
            &sql,
            params![phone, date.format(DATE_FORMAT).to_string()],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    booking.transpose()
}

/// Most recent active booking on `date`, narrowed by time and name when given.
pub fn find_active_booking(
    conn: &Connection,
    date: &NaiveDate,
    time: Option<&NaiveTime>,
    customer_name: Option<&str>,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE date = ?1 AND status != 'cancelled'
           AND (?2 IS NULL OR time = ?2)
           AND (?3 IS NULL OR lower(customer_name) = lower(?3))
         ORDER BY created_at DESC LIMIT 1"
    );
    let booking = conn
        .query_row(
            &sql,
            params![
                date.format(DATE_FORMAT).to_string(),
                time.map(|t| t.format(TIME_FORMAT).to_string()),
                customer_name,
            ],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    booking.transpose()
}

/// Covers already held at a date and time, optionally ignoring one booking.
pub fn covers_booked(
    conn: &Connection,
    date: &NaiveDate,
    time: &NaiveTime,
    exclude_id: Option<&str>,
) -> anyhow::Result<u32> {
    let covers: i64 = conn.query_row(
        "SELECT COALESCE(SUM(COALESCE(party_size, 1)), 0) FROM bookings
         WHERE date = ?1 AND time = ?2 AND status != 'cancelled'
           AND (?3 IS NULL OR id != ?3)",
        params![
            date.format(DATE_FORMAT).to_string(),
            time.format(TIME_FORMAT).to_string(),
            exclude_id,
        ],
        |row| row.get(0),
    )?;
    Ok(u32::try_from(covers).unwrap_or(u32::MAX))
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let customer_phone: Option<String> = row.get(1)?;
    let customer_name: String = row.get(2)?;
    let customer_email: Option<String> = row.get(3)?;
    let party_size: Option<u32> = row.get(4)?;
    let date_str: String = row.get(5)?;
    let time_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?;
    let time = NaiveTime::parse_from_str(&time_str, TIME_FORMAT)?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id,
        customer_phone,
        customer_name,
        customer_email,
        party_size,
        date,
        time,
        status: BookingStatus::from_str(&status_str),
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn booking(id: &str, name: &str, party: u32, time: &str) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: id.to_string(),
            customer_phone: Some("+390612345".to_string()),
            customer_name: name.to_string(),
            customer_email: None,
            party_size: Some(party),
            date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_and_get_booking() {
        let conn = db::init_db(":memory:").unwrap();
        create_booking(&conn, &booking("b1", "Marco", 4, "20:00")).unwrap();

        let loaded = get_booking(&conn, "b1").unwrap().unwrap();
        assert_eq!(loaded.customer_name, "Marco");
        assert_eq!(loaded.party_size, Some(4));
        assert_eq!(loaded.time, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert!(get_booking(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_covers_ignore_cancelled_and_excluded() {
        let conn = db::init_db(":memory:").unwrap();
        create_booking(&conn, &booking("b1", "Marco", 4, "20:00")).unwrap();
        create_booking(&conn, &booking("b2", "Giulia", 6, "20:00")).unwrap();
        create_booking(&conn, &booking("b3", "Luca", 2, "21:00")).unwrap();
        update_booking_status(&conn, "b2", &BookingStatus::Cancelled).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let eight = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert_eq!(covers_booked(&conn, &date, &eight, None).unwrap(), 4);
        assert_eq!(covers_booked(&conn, &date, &eight, Some("b1")).unwrap(), 0);
    }

    #[test]
    fn test_find_active_booking_filters() {
        let conn = db::init_db(":memory:").unwrap();
        create_booking(&conn, &booking("b1", "Marco", 4, "20:00")).unwrap();
        create_booking(&conn, &booking("b2", "Giulia", 2, "21:00")).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let nine = NaiveTime::from_hms_opt(21, 0, 0).unwrap();

        let found = find_active_booking(&conn, &date, None, Some("marco")).unwrap().unwrap();
        assert_eq!(found.id, "b1");
        let found = find_active_booking(&conn, &date, Some(&nine), None).unwrap().unwrap();
        assert_eq!(found.id, "b2");
        assert!(find_active_booking(&conn, &date, Some(&nine), Some("Marco"))
            .unwrap()
            .is_none());
    }
}
