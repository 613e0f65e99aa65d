//! One-dimensional probe scan over a projection profile.
//!
//! A probe `len` cells long slides one cell at a time along a profile of ink
//! counts. Each position is either clear (no ink under the probe) or inked.
//! A clear-to-inked change opens a span at the probe position; the next
//! inked-to-clear change closes it at the probe's far edge, so every span is
//! dilated by the probe length.

/// Probe positions before this one never register a transition.
const TRANSITION_WARMUP: usize = 2;

/// Half-open `[start, end)` interval found by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Cumulative sums of a profile; `prefix[i]` is the ink before cell `i`.
pub fn prefix_sums(profile: &[u32]) -> Vec<u64> {
    let mut prefix = Vec::with_capacity(profile.len() + 1);
    let mut acc = 0u64;
    prefix.push(acc);
    for &count in profile {
        acc += u64::from(count);
        prefix.push(acc);
    }
    prefix
}

/// Whether the probe holds any ink at each position `0..cells - probe`.
pub fn probe_occupancy(profile: &[u32], probe: usize) -> Vec<bool> {
    if probe == 0 || profile.len() <= probe {
        return Vec::new();
    }
    let prefix = prefix_sums(profile);
    (0..profile.len() - probe)
        .map(|pos| prefix[pos + probe] > prefix[pos])
        .collect()
}

/// Pairs clear/inked transitions into spans, in scan order.
///
/// A closing transition with no open span is ignored, and a span still open
/// when the profile ends is dropped.
pub fn scan_spans(profile: &[u32], probe: usize) -> Vec<Span> {
    let occupancy = probe_occupancy(profile, probe);
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;

    for pos in TRANSITION_WARMUP..occupancy.len() {
        let (before, now) = (occupancy[pos - 1], occupancy[pos]);
        if !before && now {
            open = Some(pos);
        } else if before && !now {
            if let Some(start) = open.take() {
                spans.push(Span {
                    start,
                    end: pos + probe,
                });
            }
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(len: usize, ink: &[std::ops::Range<usize>]) -> Vec<u32> {
        let mut p = vec![0u32; len];
        for r in ink {
            for i in r.clone() {
                p[i] = 1;
            }
        }
        p
    }

    #[test]
    fn span_is_dilated_by_probe() {
        // ink at 20..30, probe 7: inked for positions 14..=29
        let spans = scan_spans(&profile(60, &[20..30]), 7);
        assert_eq!(spans, vec![Span { start: 14, end: 37 }]);
    }

    #[test]
    fn gap_narrower_than_probe_merges() {
        let spans = scan_spans(&profile(60, &[10..15, 18..22]), 4);
        assert_eq!(spans.len(), 1);
        let spans = scan_spans(&profile(60, &[10..15, 20..25]), 4);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn ink_at_the_origin_does_not_shift_pairing() {
        // the first ink closes with no opening transition
        let spans = scan_spans(&profile(60, &[0..3, 20..24]), 4);
        assert_eq!(spans, vec![Span { start: 17, end: 28 }]);
    }

    #[test]
    fn open_span_at_edge_is_dropped() {
        assert!(scan_spans(&profile(30, &[25..30]), 4).is_empty());
    }

    #[test]
    fn blank_profile_has_no_spans() {
        assert!(scan_spans(&[0; 40], 4).is_empty());
        assert!(scan_spans(&[1; 3], 4).is_empty());
    }
}
