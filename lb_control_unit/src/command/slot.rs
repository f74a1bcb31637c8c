//! Single-slot latest-command mailbox.
//!
//! One slot per mechanism. The foreground publishes, the owning background
//! task takes at the start of each tick. There is no queue: publishing over
//! a command that has not been taken yet replaces it, so only the most
//! recent request is ever honored (latest write wins).

use lb_common::control_unit::command::Stamped;
use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug)]
struct SlotInner<C> {
    pending: Option<Stamped<C>>,
    next_seq: u64,
}

/// Latest-command slot. Stored values are immutable snapshots.
#[derive(Debug)]
pub struct CommandSlot<C> {
    name: &'static str,
    inner: Mutex<SlotInner<C>>,
}

impl<C: Copy> CommandSlot<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(SlotInner {
                pending: None,
                next_seq: 1,
            }),
        }
    }

    /// Store `command`, replacing any pending one. Returns its sequence
    /// number; numbers strictly increase per slot.
    pub fn publish(&self, issued_at_ms: u64, command: C) -> u64 {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let replaced = inner.pending.replace(Stamped {
            seq,
            issued_at_ms,
            command,
        });
        if let Some(old) = replaced {
            trace!(slot = self.name, dropped = old.seq, seq, "Pending command superseded");
        }
        seq
    }

    /// Swap the pending command out, leaving the slot empty.
    #[inline]
    pub fn take(&self) -> Option<Stamped<C>> {
        self.inner.lock().pending.take()
    }

    /// Whether a command is waiting.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Sequence number of the most recent publish (0 if none).
    pub fn last_seq(&self) -> u64 {
        self.inner.lock().next_seq - 1
    }
}
