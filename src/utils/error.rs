use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("No serial ports detected")]
    NoPortsFound,

    #[error("Multiple serial ports detected: {}. Specify one with the 'port' setting", .ports.join(", "))]
    AmbiguousPorts { ports: Vec<String> },

    #[error("Hostname must be specified for TCP interface")]
    MissingHost,

    #[error("Invalid interface type: {}", .value.as_deref().unwrap_or("<none>"))]
    InvalidTransportKind { value: Option<String> },

    #[error("Permission denied or device busy opening {target}: {source}")]
    PermissionDenied {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open transport {target}: {source}")]
    TransportOpen {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Feed request failed: {0}")]
    FeedUnavailable(#[from] reqwest::Error),

    #[error("Feed payload could not be decoded: {0}")]
    FeedParseError(#[from] serde_json::Error),

    #[error("Send failed: {message}")]
    SendFailure { message: String },

    #[error("Transport lost: {source}")]
    TransportLost {
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, AlertError>;

/// 錯誤分類，BroadcastState 只記錄分類而不保留整個錯誤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoPortsFound,
    AmbiguousPorts,
    MissingHost,
    InvalidTransportKind,
    PermissionDenied,
    TransportOpen,
    FeedUnavailable,
    FeedParseError,
    SendFailure,
    TransportLost,
    Io,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 單一週期內的問題，下一週期照常
    Low,
    /// 可重試
    Medium,
    /// 設定錯誤，需要操作人員介入
    High,
    /// 執行期間失去裝置
    Critical,
}

impl AlertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlertError::NoPortsFound => ErrorKind::NoPortsFound,
            AlertError::AmbiguousPorts { .. } => ErrorKind::AmbiguousPorts,
            AlertError::MissingHost => ErrorKind::MissingHost,
            AlertError::InvalidTransportKind { .. } => ErrorKind::InvalidTransportKind,
            AlertError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            AlertError::TransportOpen { .. } => ErrorKind::TransportOpen,
            AlertError::FeedUnavailable(_) => ErrorKind::FeedUnavailable,
            AlertError::FeedParseError(_) => ErrorKind::FeedParseError,
            AlertError::SendFailure { .. } => ErrorKind::SendFailure,
            AlertError::TransportLost { .. } => ErrorKind::TransportLost,
            AlertError::IoError(_) => ErrorKind::Io,
            AlertError::ConfigError { .. }
            | AlertError::MissingConfigError { .. }
            | AlertError::InvalidConfigValueError { .. } => ErrorKind::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::FeedUnavailable | ErrorKind::FeedParseError | ErrorKind::SendFailure => {
                ErrorSeverity::Low
            }
            ErrorKind::PermissionDenied => ErrorSeverity::Medium,
            ErrorKind::NoPortsFound
            | ErrorKind::AmbiguousPorts
            | ErrorKind::MissingHost
            | ErrorKind::InvalidTransportKind
            | ErrorKind::TransportOpen
            | ErrorKind::Io
            | ErrorKind::Configuration => ErrorSeverity::High,
            ErrorKind::TransportLost => ErrorSeverity::Critical,
        }
    }

    /// 廣播迴圈遇到此類錯誤時必須關閉傳輸並結束
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransportLost)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NoPortsFound => {
                "Connect the radio over USB, or switch to the tcp interface type"
            }
            ErrorKind::AmbiguousPorts => "Pass --port with one of the listed serial devices",
            ErrorKind::MissingHost => "Pass --host or set interface.hostname in the config file",
            ErrorKind::InvalidTransportKind => {
                "Set interface.type to 'serial' or 'tcp', or pass --interface-type"
            }
            ErrorKind::PermissionDenied => {
                "Add the user to the dialout group or close other programs using the device"
            }
            ErrorKind::TransportOpen => "Check the device path or host address",
            ErrorKind::FeedUnavailable => "Check network connectivity; the next cycle will retry",
            ErrorKind::FeedParseError => {
                "The feed returned unexpected data; the next cycle will retry"
            }
            ErrorKind::SendFailure => {
                "The radio rejected the message; the next alert will still be tried"
            }
            ErrorKind::TransportLost => "Reconnect the radio and restart the service",
            ErrorKind::Io => "Check file permissions and paths",
            ErrorKind::Configuration => "Fix the configuration file or command line arguments",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AlertError::AmbiguousPorts { ports } => format!(
                "Found {} serial ports ({}), cannot pick one automatically",
                ports.len(),
                ports.join(", ")
            ),
            AlertError::TransportLost { .. } => {
                "Lost connection to the radio, shutting down".to_string()
            }
            other => other.to_string(),
        }
    }

    /// 依 I/O 錯誤判斷裝置是否已經消失
    pub fn from_send_io(source: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let lost = matches!(
            source.kind(),
            Io::BrokenPipe
                | Io::ConnectionReset
                | Io::ConnectionAborted
                | Io::NotConnected
                | Io::UnexpectedEof
        ) || is_device_gone(&source);

        if lost {
            AlertError::TransportLost { source }
        } else {
            AlertError::SendFailure {
                message: source.to_string(),
            }
        }
    }
}

/// 開啟失敗時是否值得等待後重試：權限不足，或裝置正被其他程式占用
pub fn is_retryable_open(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied || is_device_busy(err)
}

// EIO / ENXIO: the device node went away under us
#[cfg(unix)]
fn is_device_gone(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(5) | Some(6))
}

#[cfg(not(unix))]
fn is_device_gone(_err: &std::io::Error) -> bool {
    false
}

// EBUSY: serial ports are opened exclusively (TIOCEXCL)
#[cfg(unix)]
fn is_device_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(16)
}

#[cfg(not(unix))]
fn is_device_busy(_err: &std::io::Error) -> bool {
    false
}
