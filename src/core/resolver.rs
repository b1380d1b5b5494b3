use crate::core::{PortEnumerator, Sleeper, TransportOpener};
use crate::utils::error::{AlertError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Serial,
    Tcp,
}

impl FromStr for TransportKind {
    type Err = AlertError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(TransportKind::Serial),
            "tcp" => Ok(TransportKind::Tcp),
            _ => Err(AlertError::InvalidTransportKind {
                value: Some(value.to_string()),
            }),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Serial => write!(f, "serial"),
            TransportKind::Tcp => write!(f, "tcp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub explicit_port: Option<String>,
    pub host: Option<String>,
    /// 送出文字訊息使用的頻道索引
    pub channel: u32,
}

impl TransportConfig {
    /// 由合併後的設定值建立；未知或缺少的介面類型屬於設定錯誤
    pub fn from_settings(
        kind: Option<&str>,
        explicit_port: Option<String>,
        host: Option<String>,
        channel: u32,
    ) -> Result<Self> {
        let kind = match kind {
            Some(value) => value.parse()?,
            None => return Err(AlertError::InvalidTransportKind { value: None }),
        };

        Ok(Self {
            kind,
            explicit_port: explicit_port.filter(|p| !p.trim().is_empty()),
            host,
            channel,
        })
    }
}

/// 開啟傳輸遇到權限錯誤時的重試策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// None 代表無限重試
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

pub struct TransportResolver<P, O, S> {
    ports: P,
    opener: O,
    sleeper: S,
    policy: RetryPolicy,
}

impl<P: PortEnumerator, O: TransportOpener, S: Sleeper> TransportResolver<P, O, S> {
    pub fn new(ports: P, opener: O, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            ports,
            opener,
            sleeper,
            policy,
        }
    }

    pub async fn resolve(&self, config: &TransportConfig) -> Result<O::Transport> {
        let mut retries: u32 = 0;

        loop {
            match self.open_once(config).await {
                Err(AlertError::PermissionDenied { target, source }) => {
                    retries += 1;
                    if self.policy.max_attempts.is_some_and(|max| retries >= max) {
                        tracing::error!(
                            "❌ Permission denied or device busy on {} after {} attempts, giving up",
                            target,
                            retries
                        );
                        return Err(AlertError::PermissionDenied { target, source });
                    }

                    tracing::warn!(
                        "PermissionDenied: {} ({}). Retrying in {:?}...",
                        target,
                        source,
                        self.policy.delay
                    );
                    self.sleeper.sleep(self.policy.delay).await;
                }
                other => return other,
            }
        }
    }

    async fn open_once(&self, config: &TransportConfig) -> Result<O::Transport> {
        match config.kind {
            TransportKind::Serial => {
                let port = match &config.explicit_port {
                    Some(port) => port.clone(),
                    None => self.detect_port()?,
                };
                tracing::info!("🔌 Opening serial interface on {}", port);
                self.opener.open_serial(&port, config.channel).await
            }
            TransportKind::Tcp => {
                let host = config
                    .host
                    .as_deref()
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or(AlertError::MissingHost)?;
                tracing::info!("🌐 Opening TCP interface to {}", host);
                self.opener.open_tcp(host, config.channel).await
            }
        }
    }

    fn detect_port(&self) -> Result<String> {
        let mut ports = self.ports.list_ports()?;
        tracing::debug!("Detected serial ports: {:?}", ports);

        match ports.len() {
            0 => Err(AlertError::NoPortsFound),
            1 => Ok(ports.remove(0)),
            _ => Err(AlertError::AmbiguousPorts { ports }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, Transport};
    use crate::utils::error::ErrorKind;
    use async_trait::async_trait;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct FakeTransport {
        target: String,
    }

    impl Transport for FakeTransport {
        async fn send_text(&mut self, _text: &str, _destination: Destination) -> Result<()> {
            Ok(())
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }

        fn max_payload_len(&self) -> Option<usize> {
            None
        }

        fn label(&self) -> &str {
            &self.target
        }
    }

    struct FixedPorts(Vec<&'static str>);

    impl PortEnumerator for FixedPorts {
        fn list_ports(&self) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|p| p.to_string()).collect())
        }
    }

    /// 前 N 次開啟回傳權限錯誤，之後成功
    #[derive(Clone, Default)]
    struct FlakyOpener {
        denials: u32,
        attempts: Arc<Mutex<Vec<String>>>,
        channels: Arc<Mutex<Vec<u32>>>,
        other_error: bool,
    }

    impl FlakyOpener {
        fn denying(denials: u32) -> Self {
            Self {
                denials,
                ..Self::default()
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }

        fn open(&self, target: &str, channel: u32) -> Result<FakeTransport> {
            self.channels.lock().unwrap().push(channel);
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(target.to_string());
            if self.other_error {
                return Err(AlertError::TransportOpen {
                    target: target.to_string(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            if attempts.len() as u32 <= self.denials {
                return Err(AlertError::PermissionDenied {
                    target: target.to_string(),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                });
            }
            Ok(FakeTransport {
                target: target.to_string(),
            })
        }
    }

    impl TransportOpener for FlakyOpener {
        type Transport = FakeTransport;

        async fn open_serial(&self, path: &str, channel: u32) -> Result<FakeTransport> {
            self.open(path, channel)
        }

        async fn open_tcp(&self, host: &str, channel: u32) -> Result<FakeTransport> {
            self.open(host, channel)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn serial(port: Option<&str>) -> TransportConfig {
        TransportConfig {
            kind: TransportKind::Serial,
            explicit_port: port.map(str::to_string),
            host: None,
            channel: 0,
        }
    }

    fn tcp(host: Option<&str>) -> TransportConfig {
        TransportConfig {
            kind: TransportKind::Tcp,
            explicit_port: None,
            host: host.map(str::to_string),
            channel: 0,
        }
    }

    #[tokio::test]
    async fn test_single_port_is_opened_without_retry() {
        let opener = FlakyOpener::default();
        let sleeper = RecordingSleeper::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec!["/dev/ttyUSB0"]),
            opener.clone(),
            sleeper.clone(),
            RetryPolicy::default(),
        );

        let transport = resolver.resolve(&serial(None)).await.unwrap();

        assert_eq!(transport.label(), "/dev/ttyUSB0");
        assert_eq!(opener.attempts(), vec!["/dev/ttyUSB0"]);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_port_skips_enumeration() {
        let opener = FlakyOpener::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec!["/dev/ttyUSB0", "/dev/ttyACM0"]),
            opener.clone(),
            RecordingSleeper::default(),
            RetryPolicy::default(),
        );

        let transport = resolver.resolve(&serial(Some("/dev/ttyACM0"))).await.unwrap();

        assert_eq!(transport.label(), "/dev/ttyACM0");
        assert_eq!(opener.attempts(), vec!["/dev/ttyACM0"]);
    }

    #[tokio::test]
    async fn test_multiple_ports_fail_fast_without_opening() {
        let opener = FlakyOpener::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec!["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyACM0"]),
            opener.clone(),
            RecordingSleeper::default(),
            RetryPolicy::default(),
        );

        let err = resolver.resolve(&serial(None)).await.unwrap_err();

        match err {
            AlertError::AmbiguousPorts { ports } => {
                assert_eq!(ports, vec!["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyACM0"]);
            }
            other => panic!("expected AmbiguousPorts, got {other:?}"),
        }
        assert!(opener.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_no_ports_is_fatal() {
        let opener = FlakyOpener::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec![]),
            opener.clone(),
            RecordingSleeper::default(),
            RetryPolicy::default(),
        );

        let err = resolver.resolve(&serial(None)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoPortsFound);
        assert!(opener.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_tcp_requires_host() {
        let opener = FlakyOpener::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec![]),
            opener.clone(),
            RecordingSleeper::default(),
            RetryPolicy::default(),
        );

        for host in [None, Some(""), Some("   ")] {
            let err = resolver.resolve(&tcp(host)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingHost);
        }
        assert!(opener.attempts().is_empty());

        let transport = resolver.resolve(&tcp(Some("meshtastic.local"))).await.unwrap();
        assert_eq!(transport.label(), "meshtastic.local");
    }

    #[tokio::test]
    async fn test_permission_denied_retries_until_open_succeeds() {
        let opener = FlakyOpener::denying(3);
        let sleeper = RecordingSleeper::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec!["/dev/ttyUSB0"]),
            opener.clone(),
            sleeper.clone(),
            RetryPolicy::default(),
        );

        let transport = resolver.resolve(&serial(None)).await.unwrap();

        assert_eq!(transport.label(), "/dev/ttyUSB0");
        assert_eq!(opener.attempts().len(), 4);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(5); 3]
        );
    }

    #[tokio::test]
    async fn test_permission_denied_respects_max_attempts() {
        let opener = FlakyOpener::denying(10);
        let sleeper = RecordingSleeper::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec![]),
            opener.clone(),
            sleeper.clone(),
            RetryPolicy {
                delay: Duration::from_millis(250),
                max_attempts: Some(3),
            },
        );

        let err = resolver.resolve(&tcp(Some("radio:4403"))).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(opener.attempts().len(), 3);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_open_errors_are_not_retried() {
        let opener = FlakyOpener {
            other_error: true,
            ..FlakyOpener::default()
        };
        let sleeper = RecordingSleeper::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec![]),
            opener.clone(),
            sleeper.clone(),
            RetryPolicy::default(),
        );

        let err = resolver.resolve(&serial(Some("/dev/ttyUSB9"))).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportOpen);
        assert_eq!(opener.attempts().len(), 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_configured_channel_reaches_opener() {
        let opener = FlakyOpener::default();
        let resolver = TransportResolver::new(
            FixedPorts(vec![]),
            opener.clone(),
            RecordingSleeper::default(),
            RetryPolicy::default(),
        );
        let config = TransportConfig {
            channel: 3,
            ..tcp(Some("meshtastic.local"))
        };

        resolver.resolve(&config).await.unwrap();

        assert_eq!(*opener.channels.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_transport_config_from_settings() {
        let config =
            TransportConfig::from_settings(Some("TCP"), None, Some("10.0.0.5".into()), 2).unwrap();
        assert_eq!(config.kind, TransportKind::Tcp);
        assert_eq!(config.channel, 2);

        let err = TransportConfig::from_settings(Some("bluetooth"), None, None, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransportKind);

        let err = TransportConfig::from_settings(None, None, None, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransportKind);
    }
}
