use crate::text::normalize::normalize_text;

/// Similarity in `[0, 1]` computed as `2 * M / T`, where `T` is the combined
/// character count and `M` the number of characters covered by the matching
/// blocks found by repeatedly taking the longest common substring and
/// recursing on both sides of it. Two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_characters(&a, &b) as f64 / total as f64
}

fn matched_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`. Ties resolve to the
/// earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo + 1;
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for (offset, j) in (blo..bhi).enumerate() {
            cur[offset + 1] = if a[i] == b[j] { prev[offset] + 1 } else { 0 };
            let size = cur[offset + 1];
            if size > best.2 {
                best = (i + 1 - size, j + 1 - size, size);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

/// Accumulates lines while dropping near-duplicates of anything already kept.
#[derive(Debug, Clone)]
pub struct LineDeduplicator {
    threshold: f64,
    kept: Vec<String>,
}

impl LineDeduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            kept: Vec::new(),
        }
    }

    /// Normalizes `line` and keeps it unless it is empty or at least
    /// `threshold`-similar to a previously kept line. Returns whether it was kept.
    pub fn push(&mut self, line: &str) -> bool {
        let line = normalize_text(line);
        if line.is_empty() {
            return false;
        }
        if self.kept.iter().any(|existing| {
            *existing == line || similarity_ratio(&line, existing) >= self.threshold
        }) {
            return false;
        }
        self.kept.push(line);
        true
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.kept
    }
}

/// Order-preserving near-duplicate removal over a whole list.
pub fn dedupe_lines<I, S>(lines: I, threshold: f64) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dedup = LineDeduplicator::new(threshold);
    for line in lines {
        dedup.push(line.as_ref());
    }
    dedup.into_lines()
}
