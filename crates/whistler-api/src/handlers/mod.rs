//! HTTP handlers

pub mod health;
pub mod media_registration;
pub mod reports;
pub mod uploads;
