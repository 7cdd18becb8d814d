/// Sample timestamps (whole seconds) for a video of `duration` seconds.
///
/// The horizon is `floor(duration)`, capped at `cap` when given. Samples run
/// `0, interval, 2*interval, ...` up to and including `max(horizon, 1)`, so
/// even a video of unknown length gets at least the first frame.
pub fn sample_timestamps(duration: f64, interval: u64, cap: Option<u64>) -> Vec<u64> {
    let interval = interval.max(1);
    let whole = if duration.is_finite() && duration > 0.0 {
        duration.floor() as u64
    } else {
        0
    };
    let horizon = match cap {
        Some(cap) => whole.min(cap),
        None => whole,
    };

    (0..=horizon.max(1)).step_by(interval as usize).collect()
}
