use crate::core::{AlertFormatter, AlertSource, BroadcastState, Destination, Transport};
use crate::utils::error::Result;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// 單一週期的結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub alerts_fetched: usize,
    pub sent: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// 定期抓取警報並廣播的主迴圈。
///
/// 傳輸在建構時交給迴圈，之後只有迴圈能使用它；結束時關閉一次。
/// 失敗隔離：抓取失敗以週期為單位，發送失敗以單筆警報為單位，
/// 只有 `TransportLost` 會讓迴圈結束。
pub struct BroadcastLoop<A: AlertSource, T: Transport> {
    source: A,
    transport: T,
    formatter: AlertFormatter,
    location: String,
    interval: Duration,
    destination: Destination,
    state: BroadcastState,
}

impl<A: AlertSource, T: Transport> BroadcastLoop<A, T> {
    pub fn new(source: A, transport: T, location: impl Into<String>, interval: Duration) -> Self {
        let formatter = AlertFormatter::new(transport.max_payload_len());
        Self {
            source,
            transport,
            formatter,
            location: location.into(),
            interval,
            destination: Destination::Broadcast,
            state: BroadcastState::default(),
        }
    }

    pub fn state(&self) -> &BroadcastState {
        &self.state
    }

    /// 執行直到收到關閉訊號或傳輸中斷。兩種情況都會先關閉傳輸再返回。
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<BroadcastState> {
        tracing::info!(
            "📡 Weather alerts running for {} on {} (every {:?})",
            self.location,
            self.transport.label(),
            self.interval
        );

        let outcome = loop {
            match self.run_cycle(&shutdown).await {
                Err(e) => break Err(e),
                Ok(report) if report.cancelled => break Ok(()),
                Ok(_) => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        match &outcome {
            Ok(()) => tracing::info!("Shutting down the weather alerts system..."),
            Err(e) => tracing::error!(
                "❌ Stopping broadcast loop: {} (Kind: {:?})",
                e,
                e.kind()
            ),
        }

        let BroadcastLoop {
            transport, state, ..
        } = self;

        let label = transport.label().to_string();
        if let Err(e) = transport.close().await {
            tracing::warn!("Error while closing {}: {}", label, e);
        } else {
            tracing::info!("🔌 Closed {}", label);
        }

        tracing::info!(
            "Ran {} cycles, sent {} alerts ({} send failures)",
            state.cycle_count,
            state.alerts_sent,
            state.send_failures
        );

        outcome.map(|()| state)
    }

    /// 執行一個 fetch → format → send 週期。只有致命的傳輸錯誤會回傳 Err。
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<CycleReport> {
        self.state.cycle_count += 1;
        self.state.last_cycle_started_at = Some(Utc::now());
        self.state.last_cycle_error = None;

        let mut report = CycleReport::default();

        let fetched = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                report.cancelled = true;
                return Ok(report);
            }
            fetched = self.source.fetch(&self.location) => fetched,
        };

        let alerts = match fetched {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::error!(
                    "Error in cycle {}: {} (Kind: {:?})",
                    self.state.cycle_count,
                    e,
                    e.kind()
                );
                tracing::debug!("💡 {}", e.recovery_suggestion());
                self.state.last_cycle_error = Some(e.kind());
                return Ok(report);
            }
        };

        report.alerts_fetched = alerts.len();
        if alerts.is_empty() {
            tracing::info!("No weather alerts to broadcast.");
            return Ok(report);
        }

        for alert in &alerts {
            let message = self.formatter.format(alert);
            tracing::info!("Broadcasting: {}", message);

            match self.transport.send_text(&message, self.destination).await {
                Ok(()) => {
                    report.sent += 1;
                    self.state.alerts_sent += 1;
                }
                Err(e) if e.is_fatal() => {
                    self.state.last_cycle_error = Some(e.kind());
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to send alert {}: {} (Kind: {:?})",
                        alert.id().unwrap_or(alert.event()),
                        e,
                        e.kind()
                    );
                    report.failed += 1;
                    self.state.send_failures += 1;
                    self.state.last_cycle_error = Some(e.kind());
                }
            }
        }

        tracing::info!(
            "Cycle {}: {} alerts, {} sent, {} failed",
            self.state.cycle_count,
            report.alerts_fetched,
            report.sent,
            report.failed
        );

        Ok(report)
    }
}
