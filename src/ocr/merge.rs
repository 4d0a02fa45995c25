//! Reading-order sort and line merging for OCR fragments.
//!
//! Text detectors split a single line into several fragments whenever the
//! glyph spacing is wide (CJK stat names in particular). The merger orders
//! fragments row by row, left to right, then glues horizontally adjacent
//! neighbours back into one line.
//!
//! Rows are approximate: two fragments share a row when their top edges are
//! within `row_tolerance` pixels of each other. That relation is not
//! transitive (a-b and b-c may be on the same row while a-c are not), so the
//! resulting order depends on the sort algorithm. We use a stable insertion
//! sort which tolerates the inconsistent comparator instead of inventing
//! strict row bands.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::text_box::{MergedLine, Rect, TextBox};

/// Pixel tolerances used by sorting and merging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeParams {
    /// Max top-edge difference for two fragments to count as the same row
    pub row_tolerance: i32,
    /// Max difference of top edges, and of bottom edges, for a merge
    pub edge_tolerance: i32,
    /// Max distance between the running line's right edge and the next left edge
    pub gap_tolerance: i32,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            row_tolerance: 7,
            edge_tolerance: 10,
            gap_tolerance: 35,
        }
    }
}

/// Slack applied around a query rectangle by [`TextMerger::find_with_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerance {
    Uniform(i32),
    Axes { x: i32, y: i32 },
}

impl Tolerance {
    fn axes(self) -> (i32, i32) {
        match self {
            Tolerance::Uniform(r) => (r, r),
            Tolerance::Axes { x, y } => (x, y),
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Uniform(10)
    }
}

impl From<i32> for Tolerance {
    fn from(r: i32) -> Self {
        Tolerance::Uniform(r)
    }
}

impl From<(i32, i32)> for Tolerance {
    fn from((x, y): (i32, i32)) -> Self {
        Tolerance::Axes { x, y }
    }
}

/// How [`TextMerger::find_with_box`] treats the query rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxQuery {
    /// Keep lines that lie inside the (expanded) rectangle
    #[default]
    Contain,
    /// Lines were recognized on a crop of the rectangle: shift them back into
    /// parent-image coordinates and keep all of them
    Translate,
}

/// A merged line matched by [`TextMerger::find_with_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    /// The query string this line matched
    pub target: String,
    pub line: MergedLine,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextMerger {
    params: MergeParams,
}

impl TextMerger {
    pub fn new(params: MergeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MergeParams {
        &self.params
    }

    /// Reading-order comparison of two fragments.
    pub fn compare(&self, a: &TextBox, b: &TextBox) -> Ordering {
        if (a.top() - b.top()).abs() <= self.params.row_tolerance {
            a.left().cmp(&b.left())
        } else {
            a.top().cmp(&b.top())
        }
    }

    /// Sorts fragments top to bottom, then left to right within a row.
    pub fn sort(&self, mut fragments: Vec<TextBox>) -> Vec<TextBox> {
        insertion_sort_by(&mut fragments, |a, b| self.compare(a, b));
        fragments
    }

    fn can_merge(&self, acc: &TextBox, next: &TextBox) -> bool {
        let p = &self.params;
        (next.top() - acc.top()).abs() <= p.edge_tolerance
            && (next.bottom() - acc.bottom()).abs() <= p.edge_tolerance
            && (next.left() - acc.right()).abs() <= p.gap_tolerance
    }

    /// Sorts the fragments and merges horizontally adjacent neighbours.
    ///
    /// A merged line keeps its first fragment's top, bottom, left edge and
    /// score; its right edge is the right edge of the last fragment absorbed.
    pub fn merge(&self, fragments: Vec<TextBox>) -> Vec<MergedLine> {
        let fragment_count = fragments.len();
        let mut sorted = self.sort(fragments).into_iter();

        let Some(mut acc) = sorted.next() else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        for next in sorted {
            if self.can_merge(&acc, &next) {
                acc.raw_text.push_str(&next.raw_text);
                acc.rect.x_max = next.rect.x_max;
            } else {
                lines.push(std::mem::replace(&mut acc, next));
            }
        }
        lines.push(acc);

        tracing::debug!(fragments = fragment_count, lines = lines.len(), "merged OCR fragments");
        lines
    }

    /// Lines whose text is contained in, or contains, one of `targets`.
    ///
    /// Each (target, line) pair yields one match. Results are ordered by
    /// descending score; equal scores keep target-then-line order.
    pub fn find_with_text<S: AsRef<str>>(&self, lines: &[MergedLine], targets: &[S]) -> Vec<TextMatch> {
        let mut matches = Vec::new();
        for target in targets {
            let target = target.as_ref();
            for line in lines {
                if target.contains(line.raw_text.as_str()) || line.raw_text.contains(target) {
                    tracing::debug!(query = target, matched = %line.raw_text, "text match");
                    matches.push(TextMatch {
                        target: target.to_string(),
                        line: line.clone(),
                    });
                }
            }
        }
        matches.sort_by(|a, b| b.line.score.total_cmp(&a.line.score));
        matches
    }

    /// Lines located by a query rectangle, in reading order.
    pub fn find_with_box(
        &self,
        lines: &[MergedLine],
        rect: &Rect,
        tolerance: Tolerance,
        mode: BoxQuery,
    ) -> Vec<MergedLine> {
        let found: Vec<MergedLine> = match mode {
            BoxQuery::Contain => {
                let (dx, dy) = tolerance.axes();
                lines
                    .iter()
                    .filter(|line| rect.contains_with_slack(&line.rect, dx, dy))
                    .cloned()
                    .collect()
            }
            BoxQuery::Translate => lines
                .iter()
                .map(|line| TextBox {
                    rect: line.rect.offset(rect.x_min, rect.y_min),
                    ..line.clone()
                })
                .collect(),
        };
        self.sort(found)
    }
}

/// Stable insertion sort. Unlike `slice::sort_by` it never panics on a
/// comparator that is not a total order.
fn insertion_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Sorts and merges fragments with the default tolerances.
pub fn merge_and_sort(fragments: Vec<TextBox>) -> Vec<MergedLine> {
    TextMerger::default().merge(fragments)
}

pub fn find_by_text<S: AsRef<str>>(lines: &[MergedLine], targets: &[S]) -> Vec<TextMatch> {
    TextMerger::default().find_with_text(lines, targets)
}

pub fn find_by_box(
    lines: &[MergedLine],
    rect: &Rect,
    tolerance: impl Into<Tolerance>,
    mode: BoxQuery,
) -> Vec<MergedLine> {
    TextMerger::default().find_with_box(lines, rect, tolerance.into(), mode)
}
