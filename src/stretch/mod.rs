pub mod params;
pub mod phase_vocoder;
pub mod strategy;

pub use params::HopPlan;
pub use phase_vocoder::{PhaseVocoder, StepOutcome};
pub use strategy::Resynthesis;
