//! PNG filtering implementation.
//!
//! PNG uses filtering to improve compression by exploiting correlations
//! between adjacent pixels. Filtering is a pure per-row transform, so rows of
//! different pipeline chunks can be filtered on different threads as long as
//! each chunk can read the last raw row of the chunk before it.

/// PNG filter types, in the order the adaptive heuristic breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Filter {
    /// Raw bytes.
    None = 0,
    /// Difference from the byte one pixel to the left.
    Sub = 1,
    /// Difference from the byte above.
    Up = 2,
    /// Difference from the mean of left and above.
    Average = 3,
    /// Difference from the Paeth predictor.
    Paeth = 4,
}

impl Filter {
    /// All filters in enumeration order.
    pub const ALL: [Filter; 5] = [
        Filter::None,
        Filter::Sub,
        Filter::Up,
        Filter::Average,
        Filter::Paeth,
    ];

    /// Filter type byte written before each row.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Filter {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Filter::None),
            1 => Ok(Filter::Sub),
            2 => Ok(Filter::Up),
            3 => Ok(Filter::Average),
            4 => Ok(Filter::Paeth),
            other => Err(other),
        }
    }
}

/// Filter selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Apply the same filter to every row.
    Fixed(Filter),
    /// Try every filter per row and keep the one with the lowest
    /// sum of absolute signed bytes.
    Adaptive,
}

/// Scratch buffers reused for adaptive filtering to reduce per-row allocations.
struct AdaptiveScratch {
    candidates: [Vec<u8>; 5],
}

impl AdaptiveScratch {
    fn new(row_len: usize) -> Self {
        Self {
            candidates: std::array::from_fn(|_| Vec::with_capacity(row_len)),
        }
    }
}

/// Per-task row filter.
///
/// Holds the bytes-per-pixel distance and the scratch space for the adaptive
/// heuristic; one instance is created per chunk task and never shared.
pub struct RowFilter {
    bpp: usize,
    mode: FilterMode,
    scratch: Option<AdaptiveScratch>,
}

impl RowFilter {
    /// Create a filter for rows of `row_len` bytes with pixel distance `bpp`.
    pub fn new(mode: FilterMode, bpp: usize, row_len: usize) -> Self {
        let scratch = match mode {
            FilterMode::Adaptive => Some(AdaptiveScratch::new(row_len)),
            FilterMode::Fixed(_) => None,
        };
        Self {
            bpp: bpp.max(1),
            mode,
            scratch,
        }
    }

    /// Filter `row` against `prev_row`, appending the tag byte and the
    /// filtered bytes to `output`. Returns the filter used.
    ///
    /// `prev_row` must be all zeros for the first row of the image.
    pub fn filter_into(&mut self, prev_row: &[u8], row: &[u8], output: &mut Vec<u8>) -> Filter {
        debug_assert_eq!(prev_row.len(), row.len(), "row length mismatch");
        match (self.mode, self.scratch.as_mut()) {
            (FilterMode::Fixed(filter), _) => {
                output.push(filter.tag());
                apply_filter(filter, row, prev_row, self.bpp, output);
                filter
            }
            (FilterMode::Adaptive, Some(scratch)) => {
                adaptive_filter(row, prev_row, self.bpp, output, scratch)
            }
            (FilterMode::Adaptive, None) => {
                let mut scratch = AdaptiveScratch::new(row.len());
                let filter = adaptive_filter(row, prev_row, self.bpp, output, &mut scratch);
                self.scratch = Some(scratch);
                filter
            }
        }
    }
}

/// Append `row` filtered with `filter` (without the tag byte).
pub fn apply_filter(filter: Filter, row: &[u8], prev_row: &[u8], bpp: usize, output: &mut Vec<u8>) {
    match filter {
        Filter::None => output.extend_from_slice(row),
        Filter::Sub => filter_sub(row, bpp, output),
        Filter::Up => filter_up(row, prev_row, output),
        Filter::Average => filter_average(row, prev_row, bpp, output),
        Filter::Paeth => filter_paeth(row, prev_row, bpp, output),
    }
}

/// Sub filter: difference from left pixel.
fn filter_sub(row: &[u8], bpp: usize, output: &mut Vec<u8>) {
    for (i, &byte) in row.iter().enumerate() {
        let left = if i >= bpp { row[i - bpp] } else { 0 };
        output.push(byte.wrapping_sub(left));
    }
}

/// Up filter: difference from above pixel.
fn filter_up(row: &[u8], prev_row: &[u8], output: &mut Vec<u8>) {
    output.extend(
        row.iter()
            .zip(prev_row)
            .map(|(&byte, &above)| byte.wrapping_sub(above)),
    );
}

/// Average filter: difference from average of left and above.
fn filter_average(row: &[u8], prev_row: &[u8], bpp: usize, output: &mut Vec<u8>) {
    for (i, &byte) in row.iter().enumerate() {
        let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
        let above = prev_row[i] as u16;
        let avg = ((left + above) / 2) as u8;
        output.push(byte.wrapping_sub(avg));
    }
}

/// Paeth filter: difference from Paeth predictor.
fn filter_paeth(row: &[u8], prev_row: &[u8], bpp: usize, output: &mut Vec<u8>) {
    for (i, &byte) in row.iter().enumerate() {
        let left = if i >= bpp { row[i - bpp] } else { 0 };
        let above = prev_row[i];
        let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
        output.push(byte.wrapping_sub(paeth_predictor(left, above, upper_left)));
    }
}

/// Paeth predictor function.
///
/// Selects the value (a, b, or c) closest to p = a + b - c.
#[inline]
fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let a_i = a as i16;
    let b_i = b as i16;
    let c_i = c as i16;

    let p = a_i + b_i - c_i;
    let pa = (p - a_i).abs();
    let pb = (p - b_i).abs();
    let pc = (p - c_i).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Adaptive filter selection: try every filter and keep the lowest score.
///
/// Candidates are evaluated in enumeration order and only a strictly lower
/// score replaces the current best, so ties resolve to the earlier filter.
fn adaptive_filter(
    row: &[u8],
    prev_row: &[u8],
    bpp: usize,
    output: &mut Vec<u8>,
    scratch: &mut AdaptiveScratch,
) -> Filter {
    let mut best = 0usize;
    let mut best_score = u64::MAX;

    for (idx, filter) in Filter::ALL.into_iter().enumerate() {
        let candidate = &mut scratch.candidates[idx];
        candidate.clear();
        apply_filter(filter, row, prev_row, bpp, candidate);
        let score = score_filter(candidate);
        if score < best_score {
            best_score = score;
            best = idx;
            // Nothing can strictly beat an all-zero row.
            if score == 0 {
                break;
            }
        }
    }

    let filter = Filter::ALL[best];
    output.push(filter.tag());
    output.extend_from_slice(&scratch.candidates[best]);
    filter
}

/// Score a filtered row using sum of absolute values of the bytes read as
/// signed.
///
/// Lower scores typically result in better compression.
#[inline]
pub fn score_filter(filtered: &[u8]) -> u64 {
    filtered
        .iter()
        .map(|&b| (b as i8).unsigned_abs() as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unfilter(filter: Filter, filtered: &[u8], prev: &[u8], bpp: usize) -> Vec<u8> {
        let mut out = vec![0u8; filtered.len()];
        for i in 0..filtered.len() {
            let left = if i >= bpp { out[i - bpp] } else { 0 };
            let above = prev[i];
            let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match filter {
                Filter::None => 0,
                Filter::Sub => left,
                Filter::Up => above,
                Filter::Average => ((left as u16 + above as u16) / 2) as u8,
                Filter::Paeth => paeth_predictor(left, above, upper_left),
            };
            out[i] = filtered[i].wrapping_add(predicted);
        }
        out
    }

    #[test]
    fn test_paeth_predictor() {
        assert_eq!(paeth_predictor(100, 100, 100), 100);
        assert_eq!(paeth_predictor(0, 0, 0), 0);
        // p = 10 + 20 - 15 = 15; pc = 0 is smallest.
        assert_eq!(paeth_predictor(10, 20, 15), 15);
        // Ties prefer a, then b.
        assert_eq!(paeth_predictor(5, 5, 0), 5);
    }

    #[test]
    fn test_filter_sub() {
        let row = vec![10, 20, 30, 40, 50, 60];
        let mut output = Vec::new();
        filter_sub(&row, 3, &mut output);
        assert_eq!(output, vec![10, 20, 30, 30, 30, 30]);
    }

    #[test]
    fn test_filter_up() {
        let row = vec![50, 60, 70];
        let prev = vec![10, 20, 30];
        let mut output = Vec::new();
        filter_up(&row, &prev, &mut output);
        assert_eq!(output, vec![40, 40, 40]);
    }

    #[test]
    fn test_filter_average() {
        let row = vec![10, 20, 30, 40];
        let prev = vec![4, 6, 8, 10];
        let mut output = Vec::new();
        filter_average(&row, &prev, 2, &mut output);
        // i=0: 10 - 2, i=1: 20 - 3, i=2: 30 - (10+8)/2, i=3: 40 - (20+10)/2
        assert_eq!(output, vec![8, 17, 21, 25]);
    }

    #[test]
    fn test_every_filter_is_reversible() {
        let prev: Vec<u8> = (0..24).map(|i| (i * 37 % 251) as u8).collect();
        let row: Vec<u8> = (0..24).map(|i| (i * 91 % 241) as u8).collect();
        for bpp in [1, 2, 3, 4, 8] {
            for filter in Filter::ALL {
                let mut filtered = Vec::new();
                apply_filter(filter, &row, &prev, bpp, &mut filtered);
                assert_eq!(
                    unfilter(filter, &filtered, &prev, bpp),
                    row,
                    "{filter:?} bpp={bpp}"
                );
            }
        }
    }

    #[test]
    fn test_fixed_mode_writes_tag_first() {
        let mut filter = RowFilter::new(FilterMode::Fixed(Filter::Up), 3, 6);
        let prev = vec![1, 1, 1, 1, 1, 1];
        let row = vec![2, 3, 4, 5, 6, 7];
        let mut output = Vec::new();
        let used = filter.filter_into(&prev, &row, &mut output);
        assert_eq!(used, Filter::Up);
        assert_eq!(output, vec![2, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_adaptive_prefers_none_on_ties() {
        // Zero row against zero prev: every filter scores 0.
        let mut filter = RowFilter::new(FilterMode::Adaptive, 1, 4);
        let zero = vec![0u8; 4];
        let mut output = Vec::new();
        assert_eq!(filter.filter_into(&zero, &zero, &mut output), Filter::None);
        assert_eq!(output, vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_adaptive_picks_up_for_repeated_rows() {
        let mut filter = RowFilter::new(FilterMode::Adaptive, 3, 9);
        let row = vec![200, 13, 77, 5, 250, 99, 140, 31, 66];
        let mut output = Vec::new();
        assert_eq!(filter.filter_into(&row, &row, &mut output), Filter::Up);
        assert_eq!(output[0], Filter::Up.tag());
        assert!(output[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_adaptive_picks_sub_for_horizontal_ramp() {
        let mut filter = RowFilter::new(FilterMode::Adaptive, 1, 8);
        let prev = vec![0u8; 8];
        let row: Vec<u8> = (0..8).map(|i| 100 + i * 3).collect();
        let mut output = Vec::new();
        assert_eq!(filter.filter_into(&prev, &row, &mut output), Filter::Sub);
    }

    #[test]
    fn test_adaptive_reference_vector() {
        // Scores against a zero previous row:
        // None  = |10|+|20|+|30|+|40| = 100
        // Sub   = 10 + 10 + 10 + 10 = 40
        // Up    = 100 (same as None)
        // Avg   = 10 + 15 + 20 + 25 = 70
        // Paeth = 40 (same as Sub, loses the tie)
        let mut filter = RowFilter::new(FilterMode::Adaptive, 1, 4);
        let prev = vec![0u8; 4];
        let row = vec![10, 20, 30, 40];
        let mut output = Vec::new();
        assert_eq!(filter.filter_into(&prev, &row, &mut output), Filter::Sub);
        assert_eq!(output, vec![1, 10, 10, 10, 10]);
    }

    #[test]
    fn test_score_treats_bytes_as_signed() {
        assert_eq!(score_filter(&[0, 1, 255, 128, 127]), 1 + 1 + 128 + 127);
    }

    #[test]
    fn test_previous_row_is_not_mutated() {
        let mut filter = RowFilter::new(FilterMode::Adaptive, 2, 6);
        let prev = vec![9u8, 8, 7, 6, 5, 4];
        let snapshot = prev.clone();
        let mut output = Vec::new();
        filter.filter_into(&prev, &[1, 2, 3, 4, 5, 6], &mut output);
        assert_eq!(prev, snapshot);
    }

    #[test]
    fn test_filter_try_from() {
        for f in Filter::ALL {
            assert_eq!(Filter::try_from(f.tag()), Ok(f));
        }
        assert_eq!(Filter::try_from(5), Err(5));
    }
}
