use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    Unlocked,
    Locked,
}

/// Lock status plus the `locking` re-entrancy guard.
///
/// While `locking` is set no new lock or unlock request may start. The only
/// ways out of it are [`LockState::finish`] with the ticket of the pending
/// prompt, or [`LockState::abandon`] before any prompt was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockState {
    status: LockStatus,
    locking: bool,
    ticket: u64,
    pending: Option<u64>,
    locked_at: Option<DateTime<Utc>>,
}

/// Serializable view of the lock state for hosts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockSnapshot {
    pub status: LockStatus,
    pub locking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_since: Option<DateTime<Utc>>,
    pub autolock_armed: bool,
}

impl LockState {
    pub fn unlocked() -> Self {
        Self {
            status: LockStatus::Unlocked,
            locking: false,
            ticket: 0,
            pending: None,
            locked_at: None,
        }
    }

    pub fn locked() -> Self {
        Self {
            status: LockStatus::Locked,
            locked_at: Some(Utc::now()),
            ..Self::unlocked()
        }
    }

    pub fn status(&self) -> LockStatus {
        self.status
    }

    pub fn is_locked(&self) -> bool {
        self.status == LockStatus::Locked
    }

    pub fn is_locking(&self) -> bool {
        self.locking
    }

    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        self.locked_at
    }

    /// Enters the locking phase. Returns `false` if a lock or unlock is
    /// already in flight.
    pub fn begin_lock(&mut self) -> bool {
        if self.locking {
            return false;
        }
        self.locking = true;
        self.mark_locked();
        true
    }

    /// Starts an unlock prompt from the locked state. Returns the prompt
    /// ticket, or `None` when not locked or something is already in flight.
    pub fn begin_unlock(&mut self) -> Option<u64> {
        if self.locking || !self.is_locked() {
            return None;
        }
        self.locking = true;
        Some(self.issue_ticket())
    }

    /// Ticket for the prompt of the current locking phase.
    pub fn issue_ticket(&mut self) -> u64 {
        self.ticket += 1;
        self.pending = Some(self.ticket);
        self.ticket
    }

    /// Leaves the locking phase without a prompt. Status stays locked.
    pub fn abandon(&mut self) {
        if self.pending.is_none() {
            self.locking = false;
        }
    }

    /// Resolves the pending prompt. Returns `false` for a ticket that is not
    /// the pending one, in which case nothing changes.
    pub fn finish(&mut self, ticket: u64, success: bool) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        self.locking = false;
        if success {
            self.status = LockStatus::Unlocked;
            self.locked_at = None;
        }
        true
    }

    /// Drops back to unlocked when locking has been disabled. Ignored while a
    /// prompt is pending.
    pub fn disable(&mut self) -> bool {
        if self.locking {
            return false;
        }
        self.status = LockStatus::Unlocked;
        self.locked_at = None;
        true
    }

    pub fn snapshot(&self, autolock_armed: bool) -> LockSnapshot {
        LockSnapshot {
            status: self.status,
            locking: self.locking,
            locked_since: self.locked_at,
            autolock_armed,
        }
    }

    fn mark_locked(&mut self) {
        if self.status != LockStatus::Locked {
            self.status = LockStatus::Locked;
            self.locked_at = Some(Utc::now());
        }
    }
}
