//! Dose targets and their persisted per-group record.
//!
//! One [`DosageRecord`] per group is kept in the group's
//! [`StoragePort`] slot.  The blob is a one-byte layout version followed
//! by the postcard encoding of the record.  Anything that does not
//! decode is treated as absent and the built-in defaults are used.
//!
//! Values are clamped to the configured minimums whenever they are written
//! into a record, so a mis-programmed near-zero dose can never be stored.

use serde::{Deserialize, Serialize};

use super::{GroupId, TIMED_OPTIONS};
use crate::app::ports::StoragePort;
use crate::error::{Error, Result};

const RECORD_VERSION: u8 = 1;
/// Version byte + 2 × 4 varint-encoded u16 (≤ 3 bytes each).
pub const RECORD_BUF_LEN: usize = 32;

const DEFAULT_PULSES: [u16; TIMED_OPTIONS] = [30, 60, 60, 120];
const DEFAULT_SECS: [u16; TIMED_OPTIONS] = [30, 30, 30, 30];

/// Target of one timed option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dose {
    pub pulses: u32,
    pub duration_ms: u32,
}

/// Persisted dose table of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DosageRecord {
    pub flow_pulses: [u16; TIMED_OPTIONS],
    pub duration_secs: [u16; TIMED_OPTIONS],
}

impl Default for DosageRecord {
    fn default() -> Self {
        Self {
            flow_pulses: DEFAULT_PULSES,
            duration_secs: DEFAULT_SECS,
        }
    }
}

impl DosageRecord {
    /// Dose of timed option `index`, or `None` for an out-of-range slot.
    pub fn dose(&self, index: usize) -> Option<Dose> {
        let pulses = *self.flow_pulses.get(index)?;
        let secs = *self.duration_secs.get(index)?;
        Some(Dose {
            pulses: u32::from(pulses),
            duration_ms: u32::from(secs) * 1000,
        })
    }

    /// Store a measured brew as the dose of option `index`.
    ///
    /// The duration is truncated to whole seconds and both values are
    /// raised to the minimums.  Returns the dose as stored.
    pub fn learn(
        &mut self,
        index: usize,
        pulses: u32,
        elapsed_ms: u32,
        min_pulses: u16,
        min_secs: u16,
    ) -> Option<Dose> {
        let (p, s) = clamp_dose(pulses, elapsed_ms, min_pulses, min_secs);
        *self.flow_pulses.get_mut(index)? = p;
        *self.duration_secs.get_mut(index)? = s;
        self.dose(index)
    }

    /// Copy with every slot raised to the minimums.
    pub fn clamped(mut self, min_pulses: u16, min_secs: u16) -> Self {
        for p in &mut self.flow_pulses {
            *p = (*p).max(min_pulses);
        }
        for s in &mut self.duration_secs {
            *s = (*s).max(min_secs);
        }
        self
    }

    /// Encode as version byte + postcard body.
    pub fn encode<'b>(&self, buf: &'b mut [u8; RECORD_BUF_LEN]) -> Result<&'b [u8]> {
        buf[0] = RECORD_VERSION;
        let used = postcard::to_slice(self, &mut buf[1..])?.len();
        Ok(&buf[..=used])
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&RECORD_VERSION, body)) => Ok(postcard::from_bytes(body)?),
            _ => Err(Error::CorruptRecord),
        }
    }
}

/// Saturate a measured brew into the stored representation.
pub fn clamp_dose(pulses: u32, elapsed_ms: u32, min_pulses: u16, min_secs: u16) -> (u16, u16) {
    let p = u16::try_from(pulses).unwrap_or(u16::MAX).max(min_pulses);
    let s = u16::try_from(elapsed_ms / 1000)
        .unwrap_or(u16::MAX)
        .max(min_secs);
    (p, s)
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Read the dose record of `group`.
pub fn load(storage: &impl StoragePort, group: GroupId) -> Result<DosageRecord> {
    let mut buf = [0u8; RECORD_BUF_LEN];
    let len = storage.read_record(group, &mut buf)?;
    DosageRecord::decode(&buf[..len])
}

/// Write the dose record of `group`.
pub fn save(storage: &mut impl StoragePort, group: GroupId, record: &DosageRecord) -> Result<()> {
    let mut buf = [0u8; RECORD_BUF_LEN];
    let bytes = record.encode(&mut buf)?;
    storage.write_record(group, bytes)?;
    Ok(())
}
