pub mod bridge;
pub mod cdp;
pub mod chrome;

pub use bridge::{Bridge, Locator, PageAction};
pub use chrome::CdpBridge;
