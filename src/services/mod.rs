pub mod ai;
pub mod booking;
pub mod conversation;
pub mod email;
pub mod escalation;
pub mod messaging;
pub mod replies;
pub mod safety_net;
pub mod sessions;
pub mod slots;
pub mod temporal;
