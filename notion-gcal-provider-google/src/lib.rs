//! Google Calendar as the sync target.

mod calendar;
mod convert;
mod error;
mod session;

pub use calendar::GoogleCalendar;
pub use error::classify;
pub use session::{Session, SessionData};
