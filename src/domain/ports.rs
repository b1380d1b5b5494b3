use crate::domain::model::{Alert, Destination};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// 警報來源
#[async_trait]
pub trait AlertSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<Alert>>;
}

/// 已開啟的無線電通道。`close` 取得所有權，所以最多只會被呼叫一次。
pub trait Transport: Send {
    fn send_text(
        &mut self,
        text: &str,
        destination: Destination,
    ) -> impl Future<Output = Result<()>> + Send;

    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;

    /// 單一訊息可承載的最大位元組數
    fn max_payload_len(&self) -> Option<usize>;

    fn label(&self) -> &str;
}

pub trait PortEnumerator: Send + Sync {
    fn list_ports(&self) -> Result<Vec<String>>;
}

pub trait TransportOpener: Send + Sync {
    type Transport: Transport;

    fn open_serial(
        &self,
        path: &str,
        channel: u32,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;

    fn open_tcp(
        &self,
        host: &str,
        channel: u32,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

/// 可注入的等待，讓重試邏輯在測試中不必真的睡眠
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
