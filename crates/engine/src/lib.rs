pub mod claim;
pub mod fetch;
pub mod scheduler;
pub mod select;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use claim::{FormPoster, HttpFormPoster, RescheduleTransactor};
pub use fetch::AvailabilityFetcher;
pub use scheduler::{PollScheduler, RunOutcome};
pub use session::SessionManager;
