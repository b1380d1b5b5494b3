use crate::utils::error::ErrorKind;
use chrono::{DateTime, Utc};

pub const UNKNOWN_EVENT: &str = "Unknown Event";
pub const NO_HEADLINE: &str = "No headline";
pub const NO_DESCRIPTION: &str = "No description";
pub const NO_INSTRUCTION: &str = "No instruction";

/// Meshtastic 的廣播節點編號
pub const BROADCAST_NUM: u32 = 0xFFFF_FFFF;

/// 一筆來自 feed 的警報，建立後不可變更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    id: Option<String>,
    event: Option<String>,
    headline: Option<String>,
    description: Option<String>,
    instruction: Option<String>,
}

impl Alert {
    pub fn new(
        id: Option<String>,
        event: Option<String>,
        headline: Option<String>,
        description: Option<String>,
        instruction: Option<String>,
    ) -> Self {
        Self {
            id: non_blank(id),
            event: non_blank(event),
            headline: non_blank(headline),
            description: non_blank(description),
            instruction: non_blank(instruction),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn event(&self) -> &str {
        self.event.as_deref().unwrap_or(UNKNOWN_EVENT)
    }

    pub fn headline(&self) -> &str {
        self.headline.as_deref().unwrap_or(NO_HEADLINE)
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_DESCRIPTION)
    }

    pub fn instruction(&self) -> &str {
        self.instruction.as_deref().unwrap_or(NO_INSTRUCTION)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Broadcast,
    Node(u32),
}

impl Destination {
    pub fn node_num(self) -> u32 {
        match self {
            Destination::Broadcast => BROADCAST_NUM,
            Destination::Node(num) => num,
        }
    }
}

/// 廣播迴圈的觀測狀態，只存在於行程內
#[derive(Debug, Clone, Default)]
pub struct BroadcastState {
    pub cycle_count: u64,
    pub last_cycle_error: Option<ErrorKind>,
    pub last_cycle_started_at: Option<DateTime<Utc>>,
    pub alerts_sent: u64,
    pub send_failures: u64,
}
