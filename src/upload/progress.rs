/// Overall completion of a submission, counted in files.
///
/// Files in batches already acknowledged count fully. The batch in flight
/// contributes its share of the total scaled by the fraction of its bytes
/// sent so far.
pub fn fraction_complete(
    total_enqueued: usize,
    remaining_before_batch: usize,
    batch_files: usize,
    bytes_sent: u64,
    bytes_total: u64,
) -> f64 {
    debug_assert!(total_enqueued > 0, "progress of an empty submission");
    if total_enqueued == 0 {
        return 0.0;
    }

    let done = total_enqueued.saturating_sub(remaining_before_batch) as f64;
    let in_flight = if bytes_total == 0 {
        1.0
    } else {
        (bytes_sent.min(bytes_total) as f64) / (bytes_total as f64)
    };
    ((done + in_flight * batch_files as f64) / total_enqueued as f64).clamp(0.0, 1.0)
}

/// Tracks progress across the batches of one submission and never reports
/// a value lower than one it already reported.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_enqueued: usize,
    remaining_before_batch: usize,
    batch_files: usize,
    last: f64,
}

impl ProgressTracker {
    pub fn new(total_enqueued: usize) -> Self {
        Self {
            total_enqueued,
            remaining_before_batch: total_enqueued,
            batch_files: 0,
            last: 0.0,
        }
    }

    /// Starts a new batch and returns the baseline for it.
    pub fn begin_batch(&mut self, remaining_before_batch: usize, batch_files: usize) -> f64 {
        self.remaining_before_batch = remaining_before_batch;
        self.batch_files = batch_files;
        self.bump(0, 1)
    }

    pub fn on_bytes(&mut self, bytes_sent: u64, bytes_total: u64) -> f64 {
        let value = self.compute(bytes_sent, bytes_total);
        // Only an acknowledged batch may finish the bar.
        if value < 1.0 {
            self.record(value);
        }
        self.last
    }

    pub fn complete_batch(&mut self) -> f64 {
        self.bump(1, 1)
    }

    pub fn current(&self) -> f64 {
        self.last
    }

    fn bump(&mut self, bytes_sent: u64, bytes_total: u64) -> f64 {
        let value = self.compute(bytes_sent, bytes_total);
        self.record(value);
        self.last
    }

    fn compute(&self, bytes_sent: u64, bytes_total: u64) -> f64 {
        fraction_complete(
            self.total_enqueued,
            self.remaining_before_batch,
            self.batch_files,
            bytes_sent,
            bytes_total,
        )
    }

    fn record(&mut self, value: f64) {
        if value > self.last {
            self.last = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_counts_files_not_bytes() {
        assert_eq!(fraction_complete(4, 4, 2, 0, 100), 0.0);
        assert_eq!(fraction_complete(4, 2, 2, 0, 100), 0.5);
        assert_eq!(fraction_complete(4, 2, 2, 50, 100), 0.75);
    }

    #[test]
    fn final_byte_reaches_exactly_one() {
        assert_eq!(fraction_complete(3, 1, 1, 7, 7), 1.0);
        assert_eq!(fraction_complete(10, 10, 10, 3, 3), 1.0);
    }

    #[test]
    fn zero_byte_batch_counts_as_sent() {
        assert_eq!(fraction_complete(2, 1, 1, 0, 0), 1.0);
    }

    #[test]
    fn tracker_is_monotonic_and_finishes_on_ack() {
        let mut tracker = ProgressTracker::new(3);
        let mut seen = vec![tracker.begin_batch(3, 2)];
        seen.push(tracker.on_bytes(10, 40));
        seen.push(tracker.on_bytes(40, 40));
        // Late or repeated events must not move the bar backwards.
        seen.push(tracker.on_bytes(5, 40));
        seen.push(tracker.complete_batch());
        seen.push(tracker.begin_batch(1, 1));
        seen.push(tracker.on_bytes(9, 9));
        assert!(tracker.current() < 1.0);
        seen.push(tracker.complete_batch());

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(*seen.last().unwrap(), 1.0);
        assert_eq!(seen.iter().filter(|v| **v == 1.0).count(), 1);
    }
}
