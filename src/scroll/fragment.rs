//! Display fragments and the ordered fragment sequence.

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::Expression;
use crate::error::{Error, Result};
use crate::scene::{Aabb2, Affine2};

/// How the parts of a fragment are arranged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FragmentLayout {
    /// Left to right on a shared baseline (`"Step 1:"` next to an equation).
    Row,
    /// Top to bottom, centered (an equation over its annotation row).
    Stack,
    /// On a shared baseline, each part centered on a given x (notes under each
    /// side of the equation above).
    Aligned,
}

/// A placed group of expressions; the unit the scroll manager reveals.
#[derive(Debug, Clone)]
pub struct DisplayFragment {
    parts: Vec<Expression>,
    /// Per-part translation from expression space into fragment space.
    offsets: Vec<[f32; 2]>,
    layout: FragmentLayout,
    label: Option<String>,
    /// Top-left corner in sequence space (y down, before scrolling).
    anchor: [f32; 2],
    order: usize,
}

impl DisplayFragment {
    pub fn single(expression: Expression) -> Self {
        Self::row(vec![expression], 0.0)
    }

    pub fn row(parts: Vec<Expression>, gap_pt: f32) -> Self {
        let ascent = max_ascent(&parts);
        let mut x = 0.0f32;
        let mut offsets = Vec::with_capacity(parts.len());
        for part in &parts {
            let b = part.bbox();
            if b.is_empty() {
                offsets.push([x, ascent]);
                continue;
            }
            offsets.push([x - b.min[0], ascent]);
            x += b.width() + gap_pt;
        }
        Self::from_parts(parts, offsets, FragmentLayout::Row)
    }

    pub fn stack(parts: Vec<Expression>, gap_pt: f32) -> Self {
        let max_w = parts.iter().map(|p| p.width()).fold(0.0f32, f32::max);
        let mut y = 0.0f32;
        let mut offsets = Vec::with_capacity(parts.len());
        for part in &parts {
            let b = part.bbox();
            if b.is_empty() {
                offsets.push([0.0, y]);
                continue;
            }
            offsets.push([(max_w - b.width()) * 0.5 - b.min[0], y - b.min[1]]);
            y += b.height() + gap_pt;
        }
        Self::from_parts(parts, offsets, FragmentLayout::Stack)
    }

    /// Part `i` is centered on `centers_pt[i]` in fragment space; parts without a
    /// center start at x = 0.
    pub fn aligned(parts: Vec<Expression>, centers_pt: &[f32]) -> Self {
        let ascent = max_ascent(&parts);
        let offsets = parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let b = part.bbox();
                match centers_pt.get(i) {
                    Some(cx) if !b.is_empty() => [cx - b.center()[0], ascent],
                    _ => [0.0, ascent],
                }
            })
            .collect();
        Self::from_parts(parts, offsets, FragmentLayout::Aligned)
    }

    fn from_parts(parts: Vec<Expression>, offsets: Vec<[f32; 2]>, layout: FragmentLayout) -> Self {
        Self {
            parts,
            offsets,
            layout,
            label: None,
            anchor: [0.0, 0.0],
            order: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn parts(&self) -> &[Expression] {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut [Expression] {
        &mut self.parts
    }

    pub fn part(&self, index: usize) -> Option<&Expression> {
        self.parts.get(index)
    }

    pub fn layout(&self) -> FragmentLayout {
        self.layout
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn anchor(&self) -> [f32; 2] {
        self.anchor
    }

    /// Vertical order index within the sequence.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Transform from a part's expression space into fragment space.
    pub fn fragment_from_part(&self, part: usize) -> Affine2 {
        let [dx, dy] = self.offsets.get(part).copied().unwrap_or([0.0, 0.0]);
        Affine2::translate(dx, dy)
    }

    /// Bounds in fragment space (top-left at the origin for non-empty fragments).
    pub fn bbox(&self) -> Aabb2 {
        self.parts
            .iter()
            .enumerate()
            .fold(Aabb2::empty(), |acc, (i, p)| {
                acc.union(self.fragment_from_part(i).transform_aabb(p.bbox()))
            })
    }

    pub fn height(&self) -> f32 {
        self.bbox().height()
    }
}

/// Tallest extent above the baseline among `parts`.
fn max_ascent(parts: &[Expression]) -> f32 {
    parts
        .iter()
        .map(|p| p.bbox())
        .filter(|b| !b.is_empty())
        .map(|b| -b.min[1])
        .fold(0.0f32, f32::max)
}

/// Ordered fragments plus the label index.
#[derive(Debug, Clone, Default)]
pub struct FragmentSequence {
    fragments: Vec<DisplayFragment>,
    labels: HashMap<String, usize>,
    top_pt: f32,
    gap_pt: f32,
}

impl FragmentSequence {
    pub fn new(top_pt: f32, gap_pt: f32) -> Self {
        Self {
            fragments: Vec::new(),
            labels: HashMap::new(),
            top_pt,
            gap_pt,
        }
    }

    /// Append a fragment below the last one. Returns its index.
    pub fn push(&mut self, mut fragment: DisplayFragment) -> usize {
        let index = self.fragments.len();
        fragment.order = index;
        fragment.anchor = [0.0, self.top_of(index)];
        if let Some(label) = fragment.label.clone() {
            if let Some(previous) = self.labels.insert(label.clone(), index) {
                log::warn!("fragment label {label:?} redeclared ({previous} -> {index})");
            }
        }
        self.fragments.push(fragment);
        index
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DisplayFragment> {
        self.fragments.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DisplayFragment> {
        self.fragments.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayFragment> {
        self.fragments.iter()
    }

    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownFragmentLabel(label.to_string()))
    }

    /// Sequence-space top of fragment `index`; one past the end is where the next
    /// fragment would go.
    pub fn top_of(&self, index: usize) -> f32 {
        if let Some(f) = self.fragments.get(index) {
            return f.anchor[1];
        }
        match self.fragments.last() {
            Some(last) => last.anchor[1] + last.height() + self.gap_pt,
            None => self.top_pt,
        }
    }

    /// Vertical extent of fragments `start..end` (gaps included).
    pub fn extent(&self, start: usize, end: usize) -> f32 {
        if start >= end || end > self.fragments.len() {
            return 0.0;
        }
        let last = &self.fragments[end - 1];
        last.anchor[1] + last.height() - self.fragments[start].anchor[1]
    }
}
