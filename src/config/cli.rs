use crate::core::resolver::TransportKind;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "mesh-weather-alerts")]
#[command(about = "Meshtastic Weather Alerts System")]
pub struct CliConfig {
    /// System configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Node interface type
    #[arg(short, long, value_enum)]
    pub interface_type: Option<TransportKind>,

    /// Serial port
    #[arg(short, long)]
    pub port: Option<String>,

    /// TCP host address
    #[arg(long)]
    pub host: Option<String>,

    /// State code for weather alerts (e.g., IL for Illinois)
    #[arg(short, long)]
    pub location: Option<String>,

    /// Seconds between feed polls
    #[arg(long)]
    pub interval: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}
