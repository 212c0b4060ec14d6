pub mod booking;
pub mod intent;
pub mod language;
pub mod reservation;
pub mod restaurant;
pub mod session;

pub use booking::{
    Booking, BookingOutcome, BookingRejection, BookingRequest, BookingStatus, CancelRequest,
};
pub use intent::{DialogueIntent, NluProposal};
pub use language::Language;
pub use reservation::{PartialReservationSlots, ReservationSlots, Slot};
pub use restaurant::{EscalationThresholds, RestaurantContext, TimeDefaults};
pub use session::{CallSession, ConversationMessage, DialogueState, MAX_CONTEXT_MESSAGES};
