/// Number of consecutive LEDs that make up one segment.
pub const SEGMENT_LEN: usize = 3;

/// Number of LEDs covered by one digit slot (seven segments).
pub const DIGIT_LEN: usize = SEGMENT_LEN * Segment::ALL.len();

/// One of the seven bars of a digit glyph.
///
/// The variants are declared in strip order: walking the strip from a digit's
/// base offset visits lower-right first and middle last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    LowerRight,
    Bottom,
    LowerLeft,
    UpperLeft,
    Top,
    UpperRight,
    Middle,
}

impl Segment {
    /// All segments in strip order.
    pub const ALL: [Segment; 7] = [
        Segment::LowerRight,
        Segment::Bottom,
        Segment::LowerLeft,
        Segment::UpperLeft,
        Segment::Top,
        Segment::UpperRight,
        Segment::Middle,
    ];

    /// LED index of this segment's first pixel, relative to the digit's base offset.
    #[inline]
    pub const fn offset(self) -> usize {
        match self {
            Segment::LowerRight => 0,
            Segment::Bottom => 3,
            Segment::LowerLeft => 6,
            Segment::UpperLeft => 9,
            Segment::Top => 12,
            Segment::UpperRight => 15,
            Segment::Middle => 18,
        }
    }

    /// Half-open LED range lit by this segment for a digit placed at `base`.
    #[inline]
    pub const fn range(self, base: usize) -> core::ops::Range<usize> {
        let start = base + self.offset();
        start..start + SEGMENT_LEN
    }
}

use Segment::{Bottom as B, LowerLeft as LL, LowerRight as LR, Middle as M};
use Segment::{Top as T, UpperLeft as UL, UpperRight as UR};

/// Lit segments for each decimal digit, indexed by the digit value.
const DIGIT_SEGMENTS: [&[Segment]; 10] = [
    &[LR, B, LL, UL, T, UR],
    &[LR, UR],
    &[B, LL, T, UR, M],
    &[LR, B, T, UR, M],
    &[LR, UL, UR, M],
    &[LR, B, UL, T, M],
    &[LR, B, LL, UL, T, M],
    &[LR, T, UR],
    &[LR, B, LL, UL, T, UR, M],
    &[LR, UL, T, UR, M],
];

/// Segments lit when showing `digit`, or `None` if it is not a decimal digit.
#[inline]
pub fn segments_for(digit: u8) -> Option<&'static [Segment]> {
    DIGIT_SEGMENTS.get(usize::from(digit)).copied()
}
