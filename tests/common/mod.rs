#![allow(dead_code)]

use mesh_weather_alerts::core::Transport;
use mesh_weather_alerts::{AlertError, Destination, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 記錄每一次發送與關閉的測試用傳輸
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<(String, Destination)>>>,
    pub closes: Arc<AtomicUsize>,
    pub fail_on: Vec<usize>,
}

impl RecordingTransport {
    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            fail_on,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, Destination)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    async fn send_text(&mut self, text: &str, destination: Destination) -> Result<()> {
        let index = {
            let mut sent = self.sent.lock().unwrap();
            sent.push((text.to_string(), destination));
            sent.len()
        };
        if self.fail_on.contains(&index) {
            return Err(AlertError::SendFailure {
                message: format!("injected failure on send {}", index),
            });
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn max_payload_len(&self) -> Option<usize> {
        Some(233)
    }

    fn label(&self) -> &str {
        "recording"
    }
}

pub fn feature(
    event: &str,
    headline: &str,
    description: &str,
    instruction: &str,
) -> serde_json::Value {
    serde_json::json!({
        "id": format!("https://api.weather.gov/alerts/{}", event.replace(' ', "-")),
        "type": "Feature",
        "properties": {
            "event": event,
            "headline": headline,
            "description": description,
            "instruction": instruction
        }
    })
}
