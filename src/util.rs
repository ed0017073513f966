//! Internal logging helpers.
use log::trace;
use std::time::Instant;

/// Trace the time elapsed since `start` under `name`, and return a fresh
/// start instant for the next phase.
pub(crate) fn log_duration(name: &str, start: Instant) -> Instant {
    trace!("{name:>12}: {:>13.2?}s", start.elapsed().as_secs_f32());
    Instant::now()
}
