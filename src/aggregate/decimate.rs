//! Display decimation that keeps extrema.
//!
//! The visible time span is cut into `max_points / 2` equal-width windows.
//! Each window contributes its lowest and highest sample, in time order, so
//! spikes stay visible however far a plot is zoomed out.

use std::cmp::Ordering;

/// Reduce `points` to at most `max_points` samples for display.
///
/// `view` limits the input to `[lo, hi]` in epoch seconds. When the visible
/// input already fits in `max_points` it is returned as is, sorted by time.
pub fn decimate_min_max(
    points: &[(f64, f64)],
    view: Option<(f64, f64)>,
    max_points: usize,
) -> Vec<(f64, f64)> {
    let mut visible: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(t, v)| !t.is_nan() && !v.is_nan())
        .filter(|(t, _)| view.map_or(true, |(lo, hi)| *t >= lo && *t <= hi))
        .collect();
    visible.sort_by(|a, b| a.0.total_cmp(&b.0));

    if visible.len() <= max_points {
        return visible;
    }
    if max_points < 2 {
        return visible
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .into_iter()
            .take(max_points)
            .collect();
    }

    let windows = max_points / 2;
    let first = visible[0].0;
    let span = visible[visible.len() - 1].0 - first;
    let window_of = |t: f64| -> usize {
        if span <= 0.0 {
            return 0;
        }
        (((t - first) / span * windows as f64) as usize).min(windows - 1)
    };

    let mut out = Vec::with_capacity(windows * 2);
    let mut start = 0;
    while start < visible.len() {
        let window = window_of(visible[start].0);
        let mut end = start + 1;
        while end < visible.len() && window_of(visible[end].0) == window {
            end += 1;
        }
        emit_extrema(&visible[start..end], start, &mut out);
        start = end;
    }
    out.iter().map(|&i| visible[i]).collect()
}

/// Push indices (offset by `base`) of the min and max of `chunk`, earliest
/// first.
fn emit_extrema(chunk: &[(f64, f64)], base: usize, out: &mut Vec<usize>) {
    let by_value = |a: &(usize, &(f64, f64)), b: &(usize, &(f64, f64))| -> Ordering {
        a.1 .1.total_cmp(&b.1 .1)
    };
    let min = chunk.iter().enumerate().min_by(by_value).map(|(i, _)| i);
    let max = chunk.iter().enumerate().max_by(by_value).map(|(i, _)| i);

    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => out.push(base + lo),
        (Some(lo), Some(hi)) => {
            out.push(base + lo.min(hi));
            out.push(base + lo.max(hi));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wave(n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| (i as f64, (i as f64 / 50.0).sin()))
            .collect()
    }

    #[test]
    fn test_small_input_unchanged() {
        let points = vec![(1.0, 5.0), (2.0, 3.0), (3.0, 4.0)];
        assert_eq!(decimate_min_max(&points, None, 2000), points);
    }

    #[test]
    fn test_output_bounded_and_ordered() {
        let out = decimate_min_max(&wave(100_000), None, 2000);
        assert!(out.len() <= 2000);
        assert!(out.len() > 1000);
        assert!(out.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_spike_survives() {
        let mut points = wave(50_000);
        points[31_337].1 = 1_000.0;
        points[7_001].1 = -1_000.0;

        let out = decimate_min_max(&points, None, 100);
        assert!(out.contains(&(31_337.0, 1_000.0)));
        assert!(out.contains(&(7_001.0, -1_000.0)));
    }

    #[test]
    fn test_view_limits_input() {
        let out = decimate_min_max(&wave(10_000), Some((100.0, 199.0)), 2000);
        assert_eq!(out.len(), 100);
        assert_eq!(out[0].0, 100.0);
        assert_eq!(out[99].0, 199.0);
    }

    #[test]
    fn test_unsorted_input_sorted() {
        let points = vec![(3.0, 1.0), (1.0, 2.0), (2.0, 3.0)];
        assert_eq!(
            decimate_min_max(&points, None, 10),
            vec![(1.0, 2.0), (2.0, 3.0), (3.0, 1.0)]
        );
    }

    #[test]
    fn test_identical_timestamps() {
        let points = vec![(5.0, 1.0), (5.0, 9.0), (5.0, 4.0), (5.0, -2.0)];
        let out = decimate_min_max(&points, None, 2);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&(5.0, 9.0)));
        assert!(out.contains(&(5.0, -2.0)));
    }

    #[test]
    fn test_tiny_budgets() {
        let points = wave(10);
        assert!(decimate_min_max(&points, None, 0).is_empty());
        assert_eq!(decimate_min_max(&points, None, 1).len(), 1);
    }
}
