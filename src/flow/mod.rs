//! The kiosk's workflow state machines. Nothing here touches HTTP or the clock
//! directly: callers pass `now`/`today` in and perform fetches themselves.

pub mod biometric;
pub mod booking;
pub mod fetch;
pub mod identity;
pub mod otp;
pub mod slots;
pub mod verification;
