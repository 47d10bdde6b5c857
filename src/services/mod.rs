pub mod attendance;
pub mod billing;
pub mod calendar;
pub mod chat;
pub mod outcome;
pub mod scheduling;
pub mod stats;
