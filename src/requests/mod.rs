pub mod chat;
pub mod matches;
pub mod member;
pub mod payment;
