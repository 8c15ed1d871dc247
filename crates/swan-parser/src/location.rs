//! The location calculator (spec §4.4).
//!
//! New relative to the teacher: `wp-html-api` never needs to translate a
//! sub-fragment's offsets back into a parent coordinate system because it
//! never splices a second parser's output into its own token stream. This
//! crate does, constantly (every mustache, every `s-for` header, every sjs
//! module body), so the calculator is promoted to a first-class component.
//! The offset-rebasing technique itself — "parse a wrapped fragment, then
//! walk the returned AST shifting every offset by a fixed adjustment" — is
//! the same one `svelte-parser`'s `oxc_parse.rs` uses (`adjust_offsets`,
//! the `actual_offset - 1` bookkeeping, `collect_comments`'s
//! `target_offset - wrapper_offset` math); here it is generalized so the
//! "fixed adjustment" can itself depend on position, via `gaps`.

/// 1-based line, 0-based column, matching spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open byte range `[start, end)` into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    pub start: Position,
    pub end: Position,
}

/// Translates offsets within some fragment of source text (or within a
/// synthetic expression wrapper, e.g. the `0(...)` trick spec §4.6
/// describes) back into the document's own `(offset, line, column)`
/// coordinate system.
///
/// `gaps` and `line_terminators` are always the *whole document's* tables,
/// produced once by the code-point reader (spec §4.1); only `base_offset`
/// and `shift` change as sub-calculators are derived.
#[derive(Clone, Copy)]
pub struct LocationCalculator<'a> {
    base_offset: usize,
    shift: i64,
    gaps: &'a [usize],
    line_terminators: &'a [usize],
}

impl<'a> LocationCalculator<'a> {
    pub fn new(gaps: &'a [usize], line_terminators: &'a [usize]) -> Self {
        Self {
            base_offset: 0,
            shift: 0,
            gaps,
            line_terminators,
        }
    }

    /// `getOffsetWithGap` — maps a fragment-local offset to an absolute
    /// source offset, re-inserting any CRLF gaps that fall at or before
    /// that position. Converges because `gaps` is finite and sorted: each
    /// iteration can only add gaps whose own offset is <= the candidate,
    /// so the candidate is monotonically non-decreasing and bounded by
    /// `base_offset + o + shift + gaps.len()`.
    pub fn get_offset_with_gap(&self, local_offset: usize) -> usize {
        let target = self.base_offset as i64 + local_offset as i64 + self.shift;
        let mut candidate = target;
        loop {
            let k = self
                .gaps
                .iter()
                .take_while(|&&g| (g as i64) <= candidate)
                .count() as i64;
            let next = target + k;
            if next == candidate {
                return candidate.max(0) as usize;
            }
            candidate = next;
        }
    }

    /// `getLocation` — binary-searches `line_terminators` to recover
    /// `(line, column)` for an absolute source offset.
    pub fn get_location_at_absolute(&self, abs_offset: usize) -> Position {
        match self.line_terminators.binary_search(&abs_offset) {
            Ok(idx) | Err(idx) => {
                // `idx` is the number of line terminators strictly before
                // `abs_offset` (an exact match on a terminator's own
                // offset belongs to the line it ends, per spec's 0-based
                // column convention: the terminator itself is the last
                // column of the line it closes).
                if idx == 0 {
                    Position::new(1, abs_offset as u32)
                } else {
                    let prev_terminator = self.line_terminators[idx - 1];
                    Position::new(idx as u32 + 1, (abs_offset - prev_terminator - 1) as u32)
                }
            }
        }
    }

    pub fn position_at(&self, local_offset: usize) -> Position {
        self.get_location_at_absolute(self.get_offset_with_gap(local_offset))
    }

    /// `fixLocation` — computes the absolute `Range`/`Loc` for a fragment
    /// span `[local_start, local_end)`.
    pub fn range_and_loc(&self, local_start: usize, local_end: usize) -> (Range, Loc) {
        let abs_start = self.get_offset_with_gap(local_start);
        let abs_end = self.get_offset_with_gap(local_end);
        let loc = Loc {
            start: self.get_location_at_absolute(abs_start),
            end: self.get_location_at_absolute(abs_end),
        };
        (Range::new(abs_start, abs_end), loc)
    }

    /// Like [`range_and_loc`](Self::range_and_loc), but `start`/`end` are
    /// already absolute source offsets (e.g. raw tokenizer offsets, which
    /// the code-point reader hands out pre-rebased) and must not be passed
    /// through `get_offset_with_gap` a second time.
    pub fn range_and_loc_absolute(&self, start: usize, end: usize) -> (Range, Loc) {
        let loc = Loc {
            start: self.get_location_at_absolute(start),
            end: self.get_location_at_absolute(end),
        };
        (Range::new(start, end), loc)
    }

    /// `getSubCalculatorAfter` — a calculator whose offset 0 corresponds to
    /// this calculator's `local_offset`.
    ///
    /// `base_offset`/`shift` stay in the same *logical* (pre-gap) numbering
    /// `local_offset` itself is in, rather than resolving to an absolute
    /// offset up front — resolution only happens once, in
    /// `get_offset_with_gap`'s fixed point, so gaps that fall before this
    /// sub-calculator's origin aren't counted a second time when a later
    /// local offset is resolved through it.
    pub fn sub_calculator_after(&self, local_offset: usize) -> LocationCalculator<'a> {
        LocationCalculator {
            base_offset: self.base_offset + local_offset,
            shift: self.shift,
            gaps: self.gaps,
            line_terminators: self.line_terminators,
        }
    }

    /// Like [`sub_calculator_after`](Self::sub_calculator_after), but
    /// `abs_offset` is already an absolute source offset (e.g. a raw
    /// tokenizer token's start, per `code_point_reader.rs`'s documented
    /// invariant) rather than a logical pre-gap offset. Converts back to
    /// the logical numbering once (subtracting the gaps already folded
    /// into `abs_offset`) so that further local offsets resolved through
    /// the returned calculator — e.g. offsets reported by the script
    /// parser over a fragment lifted out of the document — correctly
    /// reinsert only the gaps that fall *within* that fragment.
    pub fn sub_calculator_after_absolute(&self, abs_offset: usize) -> LocationCalculator<'a> {
        let gaps_before = self.gaps.iter().take_while(|&&g| g < abs_offset).count();
        LocationCalculator {
            base_offset: abs_offset - gaps_before,
            shift: 0,
            gaps: self.gaps,
            line_terminators: self.line_terminators,
        }
    }

    /// `getSubCalculatorShift` — same base, but every subsequent offset is
    /// additionally shifted by `delta` (negative to compensate for a
    /// synthetic prefix such as `0(` in `processMustache`).
    pub fn sub_calculator_shift(&self, delta: i64) -> LocationCalculator<'a> {
        LocationCalculator {
            base_offset: self.base_offset,
            shift: self.shift + delta,
            gaps: self.gaps,
            line_terminators: self.line_terminators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_gaps_is_identity() {
        let calc = LocationCalculator::new(&[], &[5, 11]);
        let (range, loc) = calc.range_and_loc(0, 3);
        assert_eq!(range, Range::new(0, 3));
        assert_eq!(loc.start, Position::new(1, 0));

        let pos = calc.position_at(7);
        assert_eq!(pos, Position::new(2, 1));
    }

    #[test]
    fn gap_shifts_absolute_offset() {
        // A CRLF collapsed at absolute offset 3: everything from there on
        // must shift right by one byte relative to the logical offset.
        let calc = LocationCalculator::new(&[3], &[4]);
        assert_eq!(calc.get_offset_with_gap(3), 4);
        assert_eq!(calc.get_offset_with_gap(10), 11);
    }

    #[test]
    fn sub_calculator_shift_compensates_wrapper() {
        let calc = LocationCalculator::new(&[], &[]);
        let sub = calc.sub_calculator_after(10).sub_calculator_shift(-2);
        // Offset 2 inside `0(expr)` (right after the opening paren) maps
        // back to absolute offset 10 (the start of `expr` in the source).
        assert_eq!(sub.get_offset_with_gap(2), 10);
    }
}
