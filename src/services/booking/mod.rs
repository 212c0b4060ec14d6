pub mod http;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::{BookingOutcome, BookingRequest, CancelRequest};

/// Where confirmed reservations are written.
///
/// A rejected request (`success == false`) is a normal outcome; `Err` is reserved for
/// transport or storage failures.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn create(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome>;

    async fn cancel(&self, request: &CancelRequest) -> anyhow::Result<BookingOutcome>;

    fn name(&self) -> &'static str;
}
