//! Proportional width accounting for ordered intervals.

use crate::models::SleepSegment;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Anything with a start and an end on a millisecond axis.
pub trait TimeSpan {
    /// Signed length in milliseconds; negative for an inverted interval.
    fn raw_span_ms(&self) -> i64;
}

impl TimeSpan for SleepSegment {
    fn raw_span_ms(&self) -> i64 {
        self.raw_duration_ms()
    }
}

/// `(start_ms, end_ms)` pairs.
impl TimeSpan for (i64, i64) {
    fn raw_span_ms(&self) -> i64 {
        self.1.saturating_sub(self.0)
    }
}

/// Lengths used for accounting. Inverted intervals are clamped to zero.
pub fn clamped_spans<T: TimeSpan>(intervals: &[T]) -> Vec<i64> {
    intervals
        .iter()
        .enumerate()
        .map(|(idx, interval)| {
            let span = interval.raw_span_ms();
            if span < 0 {
                log_warn!(
                    "interval {} ends {}ms before it starts; clamping to zero width",
                    idx,
                    span.unsigned_abs()
                );
                0
            } else {
                span
            }
        })
        .collect()
}

/// Width fraction of each interval, `span / sum(spans)`, in input order.
///
/// Fractions sum to 1 whenever the total is positive. An empty input yields no
/// widths; an input whose total is zero yields all zeros.
pub fn width_fractions<T: TimeSpan>(intervals: &[T]) -> Vec<f64> {
    let spans = clamped_spans(intervals);
    // Summed as f64: a handful of near-i64::MAX spans would overflow i64.
    let total: f64 = spans.iter().map(|&span| span as f64).sum();
    if total == 0.0 {
        return vec![0.0; spans.len()];
    }
    spans.into_iter().map(|span| span as f64 / total).collect()
}
