pub mod chat;
pub mod health;
pub mod matches;
pub mod members;
pub mod payments;
