//! Presence detection — tag identifiers, the scan procedure and the
//! cross-task presence slot.
//!
//! ```text
//!  IdentTask ──offer()──▶ ┌────────────────┐ ──take()──▶ TelemetryTask
//!                         │ PresenceBuffer │
//!                         └────────────────┘
//! ```

use core::cell::RefCell;
use core::fmt::Write;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use super::ports::TagReaderPort;

// ───────────────────────────────────────────────────────────────
// TagId
// ───────────────────────────────────────────────────────────────

/// Canonical uppercase hex identifier, two characters per reader byte.
/// Empty means "no tag present this scan".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagId(heapless::String<20>);

impl TagId {
    pub const fn none() -> Self {
        Self(heapless::String::new())
    }

    /// Encode raw identifier bytes.  Bytes beyond the longest (10-byte)
    /// identifier are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut s = heapless::String::new();
        for b in bytes.iter().take(10) {
            let _ = write!(s, "{:02X}", b);
        }
        Self(s)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl core::fmt::Display for TagId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// PresenceProbe
// ───────────────────────────────────────────────────────────────

/// One scan of the reader.  Safe to call every cycle with a tag held
/// continuously in range: every successful read ends with halt + crypto
/// stop so the next probe's wakeup re-detects the same tag.
pub fn scan(reader: &mut impl TagReaderPort) -> TagId {
    if !reader.request() && !reader.wakeup() {
        return TagId::none();
    }
    let id = reader
        .read_uid()
        .map(|uid| TagId::from_bytes(&uid))
        .unwrap_or_default();
    reader.halt();
    reader.stop_crypto();
    id
}

// ───────────────────────────────────────────────────────────────
// PresenceBuffer
// ───────────────────────────────────────────────────────────────

/// Single-slot cell holding the most recent undelivered sighting.
///
/// Written by the ident task, read-and-cleared by the telemetry task.
/// Both operations run inside one critical section, so a sighting is
/// either observed by exactly one `take` or overwritten by a newer one.
pub struct PresenceBuffer {
    slot: Mutex<CriticalSectionRawMutex, RefCell<Option<TagId>>>,
}

impl PresenceBuffer {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store `id`, replacing any older sighting.  Empty ids are ignored.
    pub fn offer(&self, id: &TagId) {
        if id.is_empty() {
            return;
        }
        self.slot.lock(|slot| {
            slot.replace(Some(id.clone()));
        });
    }

    /// Remove and return the stored sighting, leaving the slot empty.
    pub fn take(&self) -> Option<TagId> {
        self.slot.lock(|slot| slot.take())
    }
}

impl Default for PresenceBuffer {
    fn default() -> Self {
        Self::new()
    }
}
