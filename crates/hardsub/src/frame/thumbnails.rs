use crate::config::ThumbnailConfig;

/// Chooses the preview timestamps (whole seconds) for a video.
///
/// Configured candidates past the end are dropped (`[0]` if nothing is left).
/// When fewer than `max_count` remain and the duration is known, evenly spaced
/// points `i * max(duration / max_count, 1)`, rounded half to even, fill the
/// gaps. The result is sorted, strictly increasing and truncated to
/// `max_count`.
pub fn thumbnail_timestamps(duration: f64, config: &ThumbnailConfig) -> Vec<u64> {
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    let max_count = config.max_count.max(1);

    let mut timestamps: Vec<u64> = config
        .candidates
        .iter()
        .copied()
        .filter(|&t| t as f64 <= duration)
        .collect();
    timestamps.sort_unstable();
    timestamps.dedup();

    if timestamps.is_empty() {
        timestamps.push(0);
    }

    if timestamps.len() < max_count && duration > 0.0 {
        let step = (duration / max_count as f64).max(1.0);
        for i in 0..max_count {
            let t = (i as f64 * step).round_ties_even() as u64;
            if t as f64 <= duration && !timestamps.contains(&t) {
                timestamps.push(t);
            }
        }
        timestamps.sort_unstable();
    }

    timestamps.truncate(max_count);
    timestamps
}

/// `thumb_<idx>_<secs>.jpg`
pub fn thumbnail_file_name(index: usize, secs: u64) -> String {
    format!("thumb_{}_{}.jpg", index, secs)
}
