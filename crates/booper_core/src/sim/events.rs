use std::collections::VecDeque;

use super::interaction::InteractionOutcome;

/// Undrained events kept before the oldest are discarded.
pub const MAX_PENDING_EVENTS: usize = 4096;

/// Notifications for presentation collaborators (HUD, audio, effects). The
/// core never reacts to its own events.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    SpawnCompleted { instance_count: usize },
    InteractionResolved(InteractionOutcome),
    LedgerChanged { species_key: String, new_count: u32 },
    ScoreChanged { new_score: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEventKind {
    SpawnCompleted,
    InteractionResolved,
    LedgerChanged,
    ScoreChanged,
}

impl SimEvent {
    pub fn kind(&self) -> SimEventKind {
        match self {
            Self::SpawnCompleted { .. } => SimEventKind::SpawnCompleted,
            Self::InteractionResolved(_) => SimEventKind::InteractionResolved,
            Self::LedgerChanged { .. } => SimEventKind::LedgerChanged,
            Self::ScoreChanged { .. } => SimEventKind::ScoreChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimEventCounts {
    pub total: u32,
    pub spawn_completed: u32,
    pub interaction_resolved: u32,
    pub ledger_changed: u32,
    pub score_changed: u32,
}

impl SimEventCounts {
    fn record(&mut self, kind: SimEventKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            SimEventKind::SpawnCompleted => {
                self.spawn_completed = self.spawn_completed.saturating_add(1)
            }
            SimEventKind::InteractionResolved => {
                self.interaction_resolved = self.interaction_resolved.saturating_add(1)
            }
            SimEventKind::LedgerChanged => {
                self.ledger_changed = self.ledger_changed.saturating_add(1)
            }
            SimEventKind::ScoreChanged => self.score_changed = self.score_changed.saturating_add(1),
        }
    }
}

/// Queue of events not yet drained by the host, plus running totals. Holds at
/// most [`MAX_PENDING_EVENTS`]; past that the oldest pending event is dropped.
#[derive(Debug, Default)]
pub struct EventBus {
    pending: VecDeque<SimEvent>,
    emitted_counts: SimEventCounts,
    dropped: u64,
}

impl EventBus {
    pub fn emit(&mut self, event: SimEvent) {
        self.emitted_counts.record(event.kind());
        if self.pending.len() >= MAX_PENDING_EVENTS {
            self.pending.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        self.pending.push_back(event);
    }

    pub fn pending(&self) -> impl Iterator<Item = &SimEvent> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        self.pending.drain(..).collect()
    }

    pub fn emitted_counts(&self) -> SimEventCounts {
        self.emitted_counts
    }

    /// Events discarded because the host fell behind on draining.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
