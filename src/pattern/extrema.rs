//! Peak/trough extraction
//!
//! A bar is a candidate peak when its high is strictly above every high in
//! the `neighborhood` bars before it and not below any high in the
//! `neighborhood` bars after it (so a plateau yields its first bar). Troughs
//! mirror this on lows.
//!
//! The retained sequence always alternates PEAK/TROUGH and consecutive
//! points are at least `min_distance` bars apart:
//! - two same-type points in a row collapse into the more extreme one;
//! - an opposite-type candidate closer than `min_distance` to the last
//!   retained point is treated as noise and dropped.

use serde::Serialize;

use crate::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtremumKind {
    Peak,
    Trough,
}

/// Local price extremum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakTrough {
    /// Index into the analysed slice
    pub index: usize,
    pub price: f64,
    pub kind: ExtremumKind,
}

impl PeakTrough {
    #[inline]
    pub fn is_peak(&self) -> bool {
        self.kind == ExtremumKind::Peak
    }

    /// Higher peak or lower trough than `other` (same kind assumed)
    #[inline]
    fn more_extreme_than(&self, other: &PeakTrough) -> bool {
        match self.kind {
            ExtremumKind::Peak => self.price > other.price,
            ExtremumKind::Trough => self.price < other.price,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExtremaConfig {
    /// Bars compared on each side
    pub neighborhood: Period,
    /// Minimum bar distance between consecutive retained points
    pub min_distance: usize,
}

impl Default for ExtremaConfig {
    fn default() -> Self {
        Self {
            neighborhood: Period::new_const(2),
            min_distance: 3,
        }
    }
}

/// Extract an alternating sequence of peaks (from `highs`) and troughs
/// (from `lows`), ordered by index.
pub fn extract(highs: &[f64], lows: &[f64], config: &ExtremaConfig) -> Vec<PeakTrough> {
    let n = highs.len().min(lows.len());
    let w = config.neighborhood.get();
    if n < 2 * w + 1 {
        return Vec::new();
    }

    let mut points: Vec<PeakTrough> = Vec::new();

    for i in w..n - w {
        let is_peak = highs[i - w..i].iter().all(|h| highs[i] > *h)
            && highs[i + 1..=i + w].iter().all(|h| highs[i] >= *h);
        let is_trough = lows[i - w..i].iter().all(|l| lows[i] < *l)
            && lows[i + 1..=i + w].iter().all(|l| lows[i] <= *l);

        // An outside bar can be both; take the kind that continues the
        // alternation.
        let kind = match (is_peak, is_trough) {
            (true, true) => match points.last() {
                Some(last) if last.is_peak() => ExtremumKind::Trough,
                _ => ExtremumKind::Peak,
            },
            (true, false) => ExtremumKind::Peak,
            (false, true) => ExtremumKind::Trough,
            (false, false) => continue,
        };
        let price = match kind {
            ExtremumKind::Peak => highs[i],
            ExtremumKind::Trough => lows[i],
        };

        push_candidate(
            &mut points,
            PeakTrough { index: i, price, kind },
            config.min_distance,
        );
    }

    points
}

fn push_candidate(points: &mut Vec<PeakTrough>, candidate: PeakTrough, min_distance: usize) {
    match points.last_mut() {
        Some(last) if last.kind == candidate.kind => {
            if candidate.more_extreme_than(last) {
                *last = candidate;
            }
        }
        Some(last) if candidate.index - last.index < min_distance => {}
        _ => points.push(candidate),
    }
}

/// Peaks only, in order
pub fn peaks(points: &[PeakTrough]) -> Vec<PeakTrough> {
    points.iter().copied().filter(PeakTrough::is_peak).collect()
}

/// Troughs only, in order
pub fn troughs(points: &[PeakTrough]) -> Vec<PeakTrough> {
    points.iter().copied().filter(|p| !p.is_peak()).collect()
}
