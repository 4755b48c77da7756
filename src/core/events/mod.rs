

pub mod base;
pub mod bus;

pub use base::{Event, REFRESH_DATA};
pub use bus::{EventBus, EventHandler};
