//! The ordered registry of application segments attached to one file.
//!
//! Segments are kept ascending by marker value, ties in arrival order, so
//! writing the collection front to back produces a well-formed header
//! block (APP0 before APP1 before APP3 and so on). Lookups are linear;
//! files carry a handful of segments at most.

use tracing::warn;

use crate::tiff::SubIfdTags;

use super::segment::{is_tiff_kind, AppSegment, RawSegment};
use super::tiff_segment::TiffSegment;

/// Ordered collection of the segments of one image file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppSegmentManager {
    segments: Vec<AppSegment>,
}

impl AppSegmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping ascending-marker order; equal markers keep arrival
    /// order.
    pub fn insert(&mut self, segment: AppSegment) {
        let pos = self
            .segments
            .iter()
            .position(|s| s.marker() > segment.marker())
            .unwrap_or(self.segments.len());
        self.segments.insert(pos, segment);
    }

    /// First segment matching (marker, identifier).
    pub fn find(&self, marker: u16, ident: &str) -> Option<&AppSegment> {
        self.segments
            .iter()
            .find(|s| s.marker() == marker && s.ident() == ident)
    }

    pub fn find_mut(&mut self, marker: u16, ident: &str) -> Option<&mut AppSegment> {
        self.segments
            .iter_mut()
            .find(|s| s.marker() == marker && s.ident() == ident)
    }

    /// Like [`find_mut`](Self::find_mut), but if the match is a raw
    /// segment of a recognized TIFF-based kind its bytes are reinterpreted
    /// first. Conversion is attempted at most once: a segment that failed
    /// to convert stays raw and is not retried.
    pub fn find_converting(
        &mut self,
        marker: u16,
        ident: &str,
        sub_ifd_tags: &SubIfdTags,
    ) -> Option<&mut AppSegment> {
        let index = self
            .segments
            .iter()
            .position(|s| s.marker() == marker && s.ident() == ident)?;

        if let AppSegment::Raw(raw) = &mut self.segments[index] {
            if is_tiff_kind(marker, raw.ident()) && !raw.conversion_attempted() {
                raw.mark_conversion_attempted();
                match TiffSegment::from_raw(raw, sub_ifd_tags) {
                    Ok(tiff) => self.segments[index] = AppSegment::Tiff(tiff),
                    Err(e) => {
                        warn!(marker, ident, error = %e, "failed to reinterpret raw segment as TIFF");
                    }
                }
            }
        }

        Some(&mut self.segments[index])
    }

    /// The TIFF-typed segment for (marker, identifier), converting a raw
    /// match or inserting an empty segment as needed.
    ///
    /// A raw match whose bytes failed to convert is replaced outright: its
    /// payload was not valid TIFF and cannot coexist with a parsed tree
    /// under the same identity.
    pub fn find_or_insert_tiff(
        &mut self,
        marker: u16,
        ident: &str,
        sub_ifd_tags: &SubIfdTags,
    ) -> &mut TiffSegment {
        self.find_converting(marker, ident, sub_ifd_tags);

        let index = match self
            .segments
            .iter()
            .position(|s| s.marker() == marker && s.ident() == ident)
        {
            Some(i) => i,
            None => {
                let pos = self
                    .segments
                    .iter()
                    .position(|s| s.marker() > marker)
                    .unwrap_or(self.segments.len());
                self.segments
                    .insert(pos, AppSegment::Tiff(TiffSegment::new(marker, ident)));
                pos
            }
        };

        let segment = &mut self.segments[index];
        if segment.as_tiff().is_none() {
            warn!(marker, ident, "replacing unconvertible raw segment");
            *segment = AppSegment::Tiff(TiffSegment::new(marker, ident));
        }
        match segment {
            AppSegment::Tiff(tiff) => tiff,
            AppSegment::Raw(_) => unreachable!("segment was just made TIFF-typed"),
        }
    }

    /// Every segment matching (marker, identifier), in order.
    pub fn find_all(&self, marker: u16, ident: &str) -> Vec<&AppSegment> {
        self.segments
            .iter()
            .filter(|s| s.marker() == marker && s.ident() == ident)
            .collect()
    }

    /// Every segment still held as raw bytes.
    pub fn raw_segments(&self) -> Vec<&RawSegment> {
        self.segments.iter().filter_map(AppSegment::as_raw).collect()
    }

    /// Every segment holding parsed TIFF directories.
    pub fn tiff_segments(&self) -> Vec<&TiffSegment> {
        self.segments.iter().filter_map(AppSegment::as_tiff).collect()
    }

    /// Remove the first match. Dropping the segment drops its directory
    /// trees with it.
    pub fn remove(&mut self, marker: u16, ident: &str) -> bool {
        match self
            .segments
            .iter()
            .position(|s| s.marker() == marker && s.ident() == ident)
        {
            Some(index) => {
                self.segments.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every match, returning how many were dropped.
    pub fn remove_all(&mut self, marker: u16, ident: &str) -> usize {
        let before = self.segments.len();
        self.segments
            .retain(|s| !(s.marker() == marker && s.ident() == ident));
        before - self.segments.len()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AppSegment> {
        self.segments.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, AppSegment> {
        self.segments.iter_mut()
    }
}

// =============================================================================
// Tests
// =============================================================================
