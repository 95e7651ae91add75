//! Periodic mood sampling while the session is detecting

mod poller;

pub use poller::{DetectionLoop, DetectionRun, StalePolicy, TickSequencer};
