mod clock;
mod events;
mod interaction;
mod ledger;
mod movement;
mod persistence;
mod population;
mod session;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{EventBus, SimEvent, SimEventCounts, SimEventKind, MAX_PENDING_EVENTS};
pub use interaction::{
    AimEvent, BlockReason, BoopTarget, InteractionDetector, InteractionOutcome, InteractionTuning,
    RaycastFilter, SphereRaycast,
};
pub use ledger::{BoopdexEntry, Completion, DiscoveryLedger};
pub use movement::{MovementAi, MovementTuning};
pub use persistence::{
    load_ledger, save_ledger, LedgerSaveError, SavedLedger, LEDGER_FILE_NAME, SAVE_VERSION,
};
pub use population::{placement_volume, CreatureId, CreatureInstance, CreaturePopulation};
pub use session::{
    ArenaBounds, Proximity, SessionConfig, SessionController, SessionLogEntry, SessionStats,
    SimulationState,
};
