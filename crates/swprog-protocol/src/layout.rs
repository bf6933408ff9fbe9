//! Frame layout -- the byte geometry both ends of the progress socket must share.
//!
//! Offsets follow `struct progress_msg` as laid out by the daemon's C compiler.
//! There is no version negotiation on this channel, so the width and byte
//! order are pinned by configuration rather than inferred from the stream.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result};

/// Width of the fixed text field holding the image name.
pub const CUR_IMAGE_LEN: usize = 256;
/// Width of the fixed text field holding the handler name.
pub const HND_NAME_LEN: usize = 64;
/// Width of the free-form info field.
pub const PRINFOSIZE: usize = 2048;

pub(crate) const OFF_MAGIC: usize = 0;
pub(crate) const OFF_STATUS: usize = 4;
pub(crate) const OFF_DWL_PERCENT: usize = 8;
pub(crate) const OFF_DWL_BYTES: usize = 12;
pub(crate) const OFF_NSTEPS: usize = 24;
pub(crate) const OFF_CUR_STEP: usize = 28;
pub(crate) const OFF_CUR_PERCENT: usize = 32;
pub(crate) const OFF_CUR_IMAGE: usize = 36;
pub(crate) const OFF_HND_NAME: usize = OFF_CUR_IMAGE + CUR_IMAGE_LEN;
pub(crate) const OFF_SOURCE: usize = OFF_HND_NAME + HND_NAME_LEN;
pub(crate) const OFF_INFOLEN: usize = OFF_SOURCE + 4;
pub(crate) const OFF_INFO: usize = OFF_INFOLEN + 4;

/// Bytes occupied by the record fields themselves (2412).
pub const RECORD_FIELDS_WIDTH: usize = OFF_INFO + PRINFOSIZE;

/// Width of one frame as sent by a 64-bit daemon: the C struct is padded to
/// 8-byte alignment, leaving 4 trailing bytes after `info`.
pub const DEFAULT_FRAME_WIDTH: usize = 2416;

/// Byte order of every integer field. Must match the producer's native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    pub(crate) fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    pub(crate) fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

/// Validated frame geometry shared between producer and consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    width: usize,
    byte_order: ByteOrder,
}

impl FrameLayout {
    pub const DEFAULT: FrameLayout = FrameLayout {
        width: DEFAULT_FRAME_WIDTH,
        byte_order: ByteOrder::Little,
    };

    /// Build a layout. Widths larger than the record fields are accepted; the
    /// extra bytes are treated as trailing padding.
    pub fn new(width: usize, byte_order: ByteOrder) -> Result<Self> {
        if width < RECORD_FIELDS_WIDTH {
            return Err(ProtocolError::LayoutTooSmall {
                width,
                min: RECORD_FIELDS_WIDTH,
            });
        }
        Ok(Self { width, byte_order })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}
