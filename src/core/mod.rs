pub mod broadcast;
pub mod fetcher;
pub mod formatter;
pub mod resolver;

pub use crate::core::formatter::AlertFormatter;
pub use crate::domain::model::{Alert, BroadcastState, Destination};
pub use crate::domain::ports::{AlertSource, PortEnumerator, Sleeper, Transport, TransportOpener};
pub use crate::utils::error::Result;
