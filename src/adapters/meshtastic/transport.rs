use crate::adapters::meshtastic::codec::{FrameCodec, START2};
use crate::adapters::meshtastic::proto::ToRadio;
use crate::adapters::meshtastic::{DEFAULT_HOP_LIMIT, MAX_TEXT_PAYLOAD};
use crate::core::{Destination, Transport};
use crate::utils::error::{AlertError, Result};
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// 透過 Meshtastic 串流協定送出文字訊息的傳輸。
///
/// 裝置送回來的資料由背景任務讀取後丟棄；讀到 EOF 或錯誤時標記為中斷，
/// 之後的 `send_text` 會回傳 `TransportLost`。
pub struct MeshTransport {
    label: String,
    channel: u32,
    writer: FramedWrite<BoxedWriter, FrameCodec>,
    drain: JoinHandle<()>,
    lost: Arc<AtomicBool>,
}

impl MeshTransport {
    pub fn from_stream<S>(stream: S, label: impl Into<String>, channel: u32) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let label = label.into();
        let (reader, writer) = tokio::io::split(stream);
        let lost = Arc::new(AtomicBool::new(false));

        let drain = tokio::spawn(drain_device(
            FramedRead::new(reader, FrameCodec),
            label.clone(),
            Arc::clone(&lost),
        ));

        Self {
            label,
            channel,
            writer: FramedWrite::new(Box::new(writer) as BoxedWriter, FrameCodec),
            drain,
            lost,
        }
    }

    /// 喚醒處於省電模式的 serial 裝置
    pub async fn wake(&mut self) -> io::Result<()> {
        let stream = self.writer.get_mut();
        stream.write_all(&[START2; 32]).await?;
        stream.flush().await
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}

impl Transport for MeshTransport {
    async fn send_text(&mut self, text: &str, destination: Destination) -> Result<()> {
        if self.is_lost() {
            return Err(AlertError::TransportLost {
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} closed the connection", self.label),
                ),
            });
        }

        if text.len() > MAX_TEXT_PAYLOAD {
            return Err(AlertError::SendFailure {
                message: format!(
                    "message is {} bytes, radio limit is {}",
                    text.len(),
                    MAX_TEXT_PAYLOAD
                ),
            });
        }

        let packet_id = next_packet_id();
        let packet = ToRadio::text(
            destination.node_num(),
            self.channel,
            packet_id,
            DEFAULT_HOP_LIMIT,
            text,
        );

        self.writer
            .send(packet)
            .await
            .map_err(AlertError::from_send_io)?;

        tracing::debug!(
            "Sent packet {:#010x} ({} bytes) to {:#010x} via {}",
            packet_id,
            text.len(),
            destination.node_num(),
            self.label
        );
        Ok(())
    }

    async fn close(mut self) -> Result<()> {
        let mut result = Ok(());

        if !self.is_lost() {
            result = self.writer.send(ToRadio::disconnect()).await;
        }
        let closed = SinkExt::<ToRadio>::close(&mut self.writer).await;
        self.drain.abort();

        result.and(closed).map_err(AlertError::IoError)
    }

    fn max_payload_len(&self) -> Option<usize> {
        Some(MAX_TEXT_PAYLOAD)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for MeshTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshTransport")
            .field("label", &self.label)
            .field("channel", &self.channel)
            .field("lost", &self.is_lost())
            .finish()
    }
}

impl Drop for MeshTransport {
    fn drop(&mut self) {
        self.drain.abort();
    }
}

fn next_packet_id() -> u32 {
    loop {
        let id = rand::random::<u32>();
        if id != 0 {
            return id;
        }
    }
}

async fn drain_device<S: AsyncRead>(
    mut frames: FramedRead<ReadHalf<S>, FrameCodec>,
    label: String,
    lost: Arc<AtomicBool>,
) {
    let mut received: u64 = 0;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => {
                received += 1;
                tracing::trace!("Discarding {} byte frame from {}", frame.len(), label);
            }
            Err(e) => {
                tracing::warn!("Read error on {}: {}", label, e);
                break;
            }
        }
    }

    tracing::warn!("{} stopped responding after {} frames", label, received);
    lost.store(true, Ordering::SeqCst);
}
