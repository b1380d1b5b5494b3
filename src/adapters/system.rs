use crate::adapters::meshtastic::{MeshTransport, DEFAULT_TCP_PORT, SERIAL_BAUD_RATE};
use crate::core::{PortEnumerator, Sleeper, TransportOpener};
use crate::utils::error::{is_retryable_open, AlertError, Result};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;

/// 列出系統上的 serial 裝置
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn list_ports(&self) -> Result<Vec<String>> {
        let ports = tokio_serial::available_ports().map_err(|e| AlertError::TransportOpen {
            target: "serial port enumeration".to_string(),
            source: io::Error::from(e),
        })?;

        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// 開啟實體 serial 裝置或 TCP 連線，回傳 Meshtastic 傳輸
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshOpener;

impl TransportOpener for MeshOpener {
    type Transport = MeshTransport;

    async fn open_serial(&self, path: &str, channel: u32) -> Result<MeshTransport> {
        let stream = tokio_serial::new(path, SERIAL_BAUD_RATE)
            .open_native_async()
            .map_err(|e| open_error(path, io::Error::from(e)))?;

        let mut transport = MeshTransport::from_stream(stream, path, channel);
        transport
            .wake()
            .await
            .map_err(|e| open_error(path, e))?;

        tracing::info!("✅ Serial interface ready on {}", path);
        Ok(transport)
    }

    async fn open_tcp(&self, host: &str, channel: u32) -> Result<MeshTransport> {
        let address = with_default_port(host);

        let stream = TcpStream::connect(&address)
            .await
            .map_err(|e| open_error(&address, e))?;
        stream.set_nodelay(true)?;

        tracing::info!("✅ TCP interface ready on {}", address);
        Ok(MeshTransport::from_stream(stream, address, channel))
    }
}

/// 權限不足或裝置忙碌歸為 `PermissionDenied`，交給 resolver 重試
fn open_error(target: &str, source: io::Error) -> AlertError {
    if is_retryable_open(&source) {
        AlertError::PermissionDenied {
            target: target.to_string(),
            source,
        }
    } else {
        AlertError::TransportOpen {
            target: target.to_string(),
            source,
        }
    }
}

/// `host` 或 `host:port`；IPv6 位址需使用 `[addr]:port`
fn with_default_port(host: &str) -> String {
    let host = host.trim();

    if host.parse::<std::net::SocketAddr>().is_ok() {
        return host.to_string();
    }
    if let Ok(ip) = host.parse::<std::net::Ipv6Addr>() {
        return format!("[{}]:{}", ip, DEFAULT_TCP_PORT);
    }
    match host.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => host.to_string(),
        _ => format!("{}:{}", host, DEFAULT_TCP_PORT),
    }
}
