mod engine;
mod state;

pub use engine::{format_time, TimerEngine};
pub use state::{Phase, TimerState, DEFAULT_TOTAL_SECONDS};
