//! Decoded progress records and the enriched event handed to subscribers.

use serde::{Deserialize, Serialize};

use crate::layout::ByteOrder;
use crate::status::{source_name, status_name, RecoveryStatus, SourceType};

/// One decoded frame. Ordinals are kept raw; use the accessors or
/// [`ProgressEvent`] for symbolic names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressRecord {
    pub magic: u32,
    pub status: u32,
    pub dwl_percent: u32,
    /// Three opaque words. See [`ProgressRecord::dwl_bytes_total`].
    pub dwl_bytes: [u32; 3],
    pub nsteps: u32,
    /// 1-based index into `nsteps`.
    pub cur_step: u32,
    pub cur_percent: u32,
    pub cur_image: String,
    pub hnd_name: String,
    pub source: u32,
    pub infolen: u32,
    pub info: String,
}

impl ProgressRecord {
    pub fn recovery_status(&self) -> Option<RecoveryStatus> {
        RecoveryStatus::from_ordinal(self.status)
    }

    pub fn source_type(&self) -> Option<SourceType> {
        SourceType::from_ordinal(self.source)
    }

    /// Total download size as written by a daemon whose `dwl_bytes` is an
    /// 8-byte aligned `unsigned long long`: word 0 is alignment padding and
    /// words 1..=2 hold the counter in the producer's byte order.
    pub fn dwl_bytes_total(&self, order: ByteOrder) -> u64 {
        words_to_u64(self.dwl_bytes, order)
    }

    /// Resolve ordinals into symbolic names.
    pub fn enrich(self) -> ProgressEvent {
        ProgressEvent::from(self)
    }
}

/// Flat keyed view of a record, as forwarded to UI layers.
///
/// Field names and the status vocabulary are the compatibility surface. The
/// JSON keys match the web UI's progress schema: `status` carries the symbolic
/// name, the raw ordinal goes under `status_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub magic: u32,
    #[serde(rename = "status")]
    pub status_name: String,
    #[serde(rename = "status_code")]
    pub status: u32,
    pub dwl_percent: u32,
    pub dwl_bytes_0: u32,
    pub dwl_bytes_1: u32,
    pub dwl_bytes_2: u32,
    pub nsteps: u32,
    #[serde(rename = "curstep")]
    pub cur_step: u32,
    #[serde(rename = "curpercent")]
    pub cur_percent: u32,
    #[serde(rename = "curimage")]
    pub cur_image: String,
    #[serde(rename = "handler")]
    pub hnd_name: String,
    pub source: u32,
    pub source_name: String,
    pub infolen: u32,
    pub info: String,
}

impl ProgressEvent {
    pub fn recovery_status(&self) -> Option<RecoveryStatus> {
        RecoveryStatus::from_ordinal(self.status)
    }

    pub fn dwl_bytes(&self) -> [u32; 3] {
        [self.dwl_bytes_0, self.dwl_bytes_1, self.dwl_bytes_2]
    }

    pub fn dwl_bytes_total(&self, order: ByteOrder) -> u64 {
        words_to_u64(self.dwl_bytes(), order)
    }
}

fn words_to_u64([_, a, b]: [u32; 3], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::Little => (u64::from(b) << 32) | u64::from(a),
        ByteOrder::Big => (u64::from(a) << 32) | u64::from(b),
    }
}

impl From<ProgressRecord> for ProgressEvent {
    fn from(r: ProgressRecord) -> Self {
        let [dwl_bytes_0, dwl_bytes_1, dwl_bytes_2] = r.dwl_bytes;
        Self {
            magic: r.magic,
            status_name: status_name(r.status).to_string(),
            status: r.status,
            dwl_percent: r.dwl_percent,
            dwl_bytes_0,
            dwl_bytes_1,
            dwl_bytes_2,
            nsteps: r.nsteps,
            cur_step: r.cur_step,
            cur_percent: r.cur_percent,
            cur_image: r.cur_image,
            hnd_name: r.hnd_name,
            source: r.source,
            source_name: source_name(r.source).to_string(),
            infolen: r.infolen,
            info: r.info,
        }
    }
}
