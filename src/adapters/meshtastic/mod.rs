//! Meshtastic 串流協定：serial 與 TCP 共用相同的封包格式。

pub mod codec;
pub mod proto;
pub mod transport;

pub use codec::FrameCodec;
pub use transport::MeshTransport;

/// TCP 介面的預設埠號
pub const DEFAULT_TCP_PORT: u16 = 4403;
pub const SERIAL_BAUD_RATE: u32 = 115_200;
/// 文字訊息的最大承載長度
pub const MAX_TEXT_PAYLOAD: usize = 233;
pub const DEFAULT_HOP_LIMIT: u32 = 3;
