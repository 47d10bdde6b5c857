pub mod auth;
pub mod matches;
pub mod member;
pub mod payment;
