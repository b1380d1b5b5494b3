pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::meshtastic::MeshTransport;
pub use adapters::system::{MeshOpener, SystemPorts, TokioSleeper};
pub use config::{CliConfig, Settings};
pub use core::{
    broadcast::BroadcastLoop,
    fetcher::AlertFetcher,
    formatter::AlertFormatter,
    resolver::{RetryPolicy, TransportConfig, TransportKind, TransportResolver},
};
pub use domain::model::{Alert, BroadcastState, Destination};
pub use utils::error::{AlertError, Result};
