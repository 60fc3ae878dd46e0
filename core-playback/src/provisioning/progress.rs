//! Progress bookkeeping for the download and extraction phases.

/// Smallest increase worth publishing.
const PUBLISH_STEP: f32 = 0.01;

/// Turns raw counters into a non-decreasing fraction in `0.0..=1.0`.
///
/// Updates are coalesced: [`advance`](Self::advance) returns a value only when
/// it moved by at least one percent or reached completion.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    done: u64,
    published: Option<f32>,
}

impl ProgressTracker {
    /// `total` is `None` when the size is unknown (no `Content-Length`).
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            done: 0,
            published: None,
        }
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    pub fn fraction(&self) -> Option<f32> {
        self.total
            .map(|total| (self.done as f64 / total as f64).min(1.0) as f32)
    }

    /// Record `amount` more units of work.
    pub fn advance(&mut self, amount: u64) -> Option<f32> {
        self.done = self.done.saturating_add(amount);
        let fraction = self.fraction()?;
        let last = self.published.unwrap_or(0.0);
        let complete = fraction >= 1.0 && last < 1.0;
        if self.published.is_none() || complete || fraction - last >= PUBLISH_STEP {
            self.published = Some(fraction.max(last));
            return self.published;
        }
        None
    }

    /// Final value; always `1.0` unless `1.0` was already returned.
    pub fn finish(&mut self) -> Option<f32> {
        if self.published == Some(1.0) {
            return None;
        }
        self.published = Some(1.0);
        Some(1.0)
    }
}
