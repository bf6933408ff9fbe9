//! Fixed-width frame codec for the progress socket.
//!
//! Wire format: one `FrameLayout::width()`-byte record per update, no prefix.
//! `decode`/`encode` work on a single frame; `ProgressCodec` reassembles frames
//! from a byte stream for `FramedRead`.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::layout::*;
use crate::record::ProgressRecord;
use crate::{ProtocolError, Result};

/// Decode one frame. Only the first `layout.width()` bytes are read; trailing
/// padding past the record fields is ignored. No semantic validation.
pub fn decode(layout: &FrameLayout, buf: &[u8]) -> Result<ProgressRecord> {
    if buf.len() < layout.width() {
        return Err(ProtocolError::TruncatedRecord {
            needed: layout.width(),
            got: buf.len(),
        });
    }

    let order = layout.byte_order();
    let word = |off: usize| order.read_u32([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);

    let infolen = word(OFF_INFOLEN);
    let info_meaningful = (infolen as usize).min(PRINFOSIZE);

    Ok(ProgressRecord {
        magic: word(OFF_MAGIC),
        status: word(OFF_STATUS),
        dwl_percent: word(OFF_DWL_PERCENT),
        dwl_bytes: [
            word(OFF_DWL_BYTES),
            word(OFF_DWL_BYTES + 4),
            word(OFF_DWL_BYTES + 8),
        ],
        nsteps: word(OFF_NSTEPS),
        cur_step: word(OFF_CUR_STEP),
        cur_percent: word(OFF_CUR_PERCENT),
        cur_image: read_text(&buf[OFF_CUR_IMAGE..OFF_CUR_IMAGE + CUR_IMAGE_LEN]),
        hnd_name: read_text(&buf[OFF_HND_NAME..OFF_HND_NAME + HND_NAME_LEN]),
        source: word(OFF_SOURCE),
        infolen,
        info: read_text(&buf[OFF_INFO..OFF_INFO + info_meaningful]),
    })
}

/// Encode one frame of exactly `layout.width()` bytes. Text longer than its
/// field is cut at the field width; `infolen` is written as given.
pub fn encode(layout: &FrameLayout, record: &ProgressRecord) -> Vec<u8> {
    let mut buf = vec![0u8; layout.width()];
    let order = layout.byte_order();
    let mut put = |off: usize, value: u32| {
        buf[off..off + 4].copy_from_slice(&order.write_u32(value));
    };

    put(OFF_MAGIC, record.magic);
    put(OFF_STATUS, record.status);
    put(OFF_DWL_PERCENT, record.dwl_percent);
    for (i, w) in record.dwl_bytes.iter().enumerate() {
        put(OFF_DWL_BYTES + 4 * i, *w);
    }
    put(OFF_NSTEPS, record.nsteps);
    put(OFF_CUR_STEP, record.cur_step);
    put(OFF_CUR_PERCENT, record.cur_percent);
    put(OFF_SOURCE, record.source);
    put(OFF_INFOLEN, record.infolen);

    write_text(&mut buf[OFF_CUR_IMAGE..OFF_CUR_IMAGE + CUR_IMAGE_LEN], &record.cur_image);
    write_text(&mut buf[OFF_HND_NAME..OFF_HND_NAME + HND_NAME_LEN], &record.hnd_name);
    write_text(&mut buf[OFF_INFO..OFF_INFO + PRINFOSIZE], &record.info);
    buf
}

/// Text up to the first NUL, or the whole field if there is none.
fn read_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn write_text(field: &mut [u8], text: &str) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
}

/// Stream codec: accumulates bytes until a whole frame is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressCodec {
    layout: FrameLayout,
}

impl ProgressCodec {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }
}

impl Decoder for ProgressCodec {
    type Item = ProgressRecord;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let width = self.layout.width();
        if src.len() < width {
            src.reserve(width - src.len());
            return Ok(None);
        }

        let frame = src.split_to(width);
        decode(&self.layout, &frame).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        // A partial frame at EOF is never delivered.
        if !src.is_empty() {
            tracing::debug!(
                discarded = src.len(),
                width = self.layout.width(),
                "dropping partial frame at end of stream"
            );
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<ProgressRecord> for ProgressCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: ProgressRecord, dst: &mut BytesMut) -> Result<()> {
        let frame = encode(&self.layout, &item);
        dst.reserve(frame.len());
        dst.put_slice(&frame);
        Ok(())
    }
}
