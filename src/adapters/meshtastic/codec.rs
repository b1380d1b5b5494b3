use crate::adapters::meshtastic::proto::ToRadio;
use bytes::{Buf, BufMut, BytesMut};
use prost::Message;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

pub const START1: u8 = 0x94;
pub const START2: u8 = 0xC3;
pub const HEADER_LEN: usize = 4;
pub const MAX_FRAME_LEN: usize = 512;

/// `START1 START2 len_hi len_lo` 加上 protobuf 本體。
///
/// 解碼時會跳過框架以外的位元組（裝置的除錯輸出會混在同一條 serial 線上）。
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Encoder<ToRadio> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ToRadio, dst: &mut BytesMut) -> io::Result<()> {
        let len = item.encoded_len();
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds {} byte limit", len, MAX_FRAME_LEN),
            ));
        }

        dst.reserve(HEADER_LEN + len);
        dst.put_u8(START1);
        dst.put_u8(START2);
        dst.put_u16(len as u16);
        item.encode(dst)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        loop {
            match src.windows(2).position(|w| w == [START1, START2]) {
                Some(0) => {}
                Some(skip) => src.advance(skip),
                None => {
                    let keep = usize::from(src.last() == Some(&START1));
                    let discard = src.len() - keep;
                    src.advance(discard);
                    return Ok(None);
                }
            }

            if src.len() < HEADER_LEN {
                return Ok(None);
            }

            let len = u16::from_be_bytes([src[2], src[3]]) as usize;
            if len > MAX_FRAME_LEN {
                // corrupt header, resync on the next start marker
                src.advance(1);
                continue;
            }

            if src.len() < HEADER_LEN + len {
                src.reserve(HEADER_LEN + len - src.len());
                return Ok(None);
            }

            src.advance(HEADER_LEN);
            return Ok(Some(src.split_to(len)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        let frame = self.decode(src)?;
        if frame.is_none() {
            src.clear();
        }
        Ok(frame)
    }
}
