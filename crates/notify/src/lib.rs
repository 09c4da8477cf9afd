pub mod hub;
pub mod pushover;
pub mod sendgrid;
pub mod webhook;

pub use hub::{channel_status, Notifier, NotifyHub};
