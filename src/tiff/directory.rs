//! Image File Directory trees: the read/write state machine.
//!
//! One directory on disk:
//!
//! ```text
//! +--------------------+
//! | u16 entry count    |
//! | count x 12-byte    |  entries, ascending tag order
//! |   entries          |
//! | u32 next directory |  0 = terminal
//! | overflow payloads  |  word-aligned blocks, tag order
//! | sub-IFD trees      |  depth-first
//! | thumbnail material |
//! +--------------------+
//! ```
//!
//! Offsets inside entries are relative to the owning segment's TIFF-header
//! origin. The writer is two-pass: offset slots are reserved as zeros and
//! patched once the pointed-at material has been written and its position
//! is known.
//!
//! Recognized sub-IFD pointer tags (34665 and friends, see
//! [`SubIfdTags`](super::tags::SubIfdTags)) are not stored as plain tags:
//! their children become part of the tree and the pointer entry is
//! re-synthesized on write with one LONG element per child.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Seek, Write};

use crate::error::TiffError;
use crate::io::ByteStream;

use super::tags::{tag, FieldType, SubIfdTags};
use super::thumbnail::{self, Thumbnail};
use super::value::{DirEntry, TagValue};

// =============================================================================
// Constants
// =============================================================================

/// Sanity ceiling on the entry count of a single directory.
pub const MAX_DIR_ENTRIES: u16 = 0x1FFF;

// =============================================================================
// Directory
// =============================================================================

/// One Image File Directory: a tag map plus its attached sub-IFD children
/// and an optional embedded thumbnail.
///
/// `tag` records which pointer tag this directory hangs off (0 for a
/// top-level directory) and `index` its position among siblings under that
/// tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    tag: u16,
    index: u16,
    entries: BTreeMap<u16, TagValue>,
    children: BTreeMap<u16, Vec<Directory>>,
    thumbnail: Option<Thumbnail>,
}

/// Where a written directory landed: its origin-relative start offset and
/// the absolute stream position of its next-directory placeholder, for the
/// caller to patch when chaining siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirPlacement {
    pub start: u32,
    pub next_link: u64,
}

/// One entry's deferred material, written to the trailing data area after
/// the entry table.
enum Deferred {
    /// An encoded payload larger than 4 bytes
    Payload {
        tag: u16,
        value_pos: u64,
        payload: Vec<u8>,
    },

    /// A sub-IFD pointer array with more than one child; elements are
    /// reserved as zeros and patched per child
    PointerArray { tag: u16, value_pos: u64, n: u32 },
}

/// What one entry slot in the table will hold.
enum Planned<'a> {
    Pointer { count: u32 },
    Value(&'a TagValue),
}

impl Directory {
    pub fn new(tag: u16, index: u16) -> Self {
        Directory {
            tag,
            index,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            thumbnail: None,
        }
    }

    /// The pointer tag this directory hangs off (0 for top-level).
    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// Position among siblings under the same pointer tag.
    pub fn index(&self) -> u16 {
        self.index
    }

    // -------------------------------------------------------------------------
    // Tag access
    // -------------------------------------------------------------------------

    pub fn tag_value(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag)
    }

    /// Insert or replace a tag.
    pub fn set_tag_value(&mut self, tag: u16, value: TagValue) {
        self.entries.insert(tag, value);
    }

    /// Remove a tag. For a sub-IFD pointer tag this also detaches every
    /// child directory attached under it.
    pub fn remove_tag(&mut self, tag: u16) -> bool {
        let had_entry = self.entries.remove(&tag).is_some();
        let had_children = self.children.remove(&tag).is_some();
        had_entry || had_children
    }

    /// Plain tags in ascending tag order.
    pub fn tags(&self) -> impl Iterator<Item = (u16, &TagValue)> + '_ {
        self.entries.iter().map(|(&t, v)| (t, v))
    }

    pub fn tag_count(&self) -> usize {
        self.entries.len()
    }

    /// First element of an integer tag, widened to u32. Dimension-style
    /// tags are stored as SHORT or LONG in the wild; storage is preserved,
    /// only the read side widens.
    pub fn tag_u32(&self, tag: u16) -> Option<u32> {
        self.entries.get(&tag).and_then(TagValue::u32)
    }

    /// All elements of an integer tag, widened to u32.
    pub fn tag_u32s(&self, tag: u16) -> Option<Vec<u32>> {
        self.entries.get(&tag).and_then(TagValue::u32s)
    }

    // -------------------------------------------------------------------------
    // Sub-IFD children
    // -------------------------------------------------------------------------

    pub fn child(&self, tag: u16, index: usize) -> Option<&Directory> {
        self.children.get(&tag).and_then(|kids| kids.get(index))
    }

    pub fn child_mut(&mut self, tag: u16, index: usize) -> Option<&mut Directory> {
        self.children.get_mut(&tag).and_then(|kids| kids.get_mut(index))
    }

    /// All children attached under a pointer tag, in order.
    pub fn children(&self, tag: u16) -> &[Directory] {
        self.children.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pointer tags that currently have children, ascending.
    pub fn child_tags(&self) -> impl Iterator<Item = u16> + '_ {
        self.children.keys().copied()
    }

    /// Attach a new empty child under a pointer tag and return it.
    pub fn add_child(&mut self, tag: u16) -> &mut Directory {
        let kids = self.children.entry(tag).or_default();
        let index = kids.len();
        kids.push(Directory::new(tag, index as u16));
        &mut kids[index]
    }

    /// The child at (tag, index), appending empty siblings up to `index`
    /// when they do not exist yet.
    pub fn child_or_create(&mut self, tag: u16, index: usize) -> &mut Directory {
        let kids = self.children.entry(tag).or_default();
        while kids.len() <= index {
            let i = kids.len() as u16;
            kids.push(Directory::new(tag, i));
        }
        &mut kids[index]
    }

    // -------------------------------------------------------------------------
    // Thumbnail
    // -------------------------------------------------------------------------

    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }

    /// Attach or detach the embedded thumbnail. Image-storage tags are
    /// reconciled with this state on the next write.
    pub fn set_thumbnail(&mut self, thumbnail: Option<Thumbnail>) {
        self.thumbnail = thumbnail;
    }

    // -------------------------------------------------------------------------
    // Read path
    // -------------------------------------------------------------------------

    /// Read the directory at `origin + offset`, recursing into recognized
    /// sub-IFD pointers, and return it with the trailing next-directory
    /// offset (0 = terminal).
    ///
    /// `visited` collects every directory offset seen in the owning
    /// segment; revisiting one fails with `DuplicateIfdOffset`, which also
    /// breaks offset cycles.
    pub fn read<S: Read + Seek>(
        stream: &mut ByteStream<S>,
        origin: u64,
        offset: u32,
        dir_tag: u16,
        index: u16,
        sub_ifd_tags: &SubIfdTags,
        visited: &mut BTreeSet<u32>,
    ) -> Result<(Directory, u32), TiffError> {
        if !visited.insert(offset) {
            return Err(TiffError::DuplicateIfdOffset(offset));
        }

        stream.seek_to(origin + offset as u64)?;
        let count = stream.read_u16()?;
        if count > MAX_DIR_ENTRIES {
            return Err(TiffError::EntryCountTooLarge {
                count,
                max: MAX_DIR_ENTRIES,
            });
        }

        // The fixed-size table is consumed as a block before any entry's
        // payload pulls the stream elsewhere.
        let mut raw_entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            raw_entries.push(DirEntry::read(stream)?);
        }
        let next_offset = stream.read_u32()?;

        let mut dir = Directory::new(dir_tag, index);
        for entry in &raw_entries {
            let value = TagValue::decode(stream, entry, origin)?;

            if sub_ifd_tags.contains(entry.tag) && entry.field_type == FieldType::Long {
                if let TagValue::Long(child_offsets) = &value {
                    let mut child_index = 0u16;
                    for &child_offset in child_offsets {
                        // A zero pointer element means "no directory here".
                        if child_offset == 0 {
                            continue;
                        }
                        let (child, _) = Directory::read(
                            stream,
                            origin,
                            child_offset,
                            entry.tag,
                            child_index,
                            sub_ifd_tags,
                            visited,
                        )?;
                        dir.children.entry(entry.tag).or_default().push(child);
                        child_index += 1;
                    }
                    continue;
                }
            }

            dir.entries.insert(entry.tag, value);
        }

        dir.thumbnail = thumbnail::materialize(&dir, stream, origin);

        Ok((dir, next_offset))
    }

    // -------------------------------------------------------------------------
    // Write path
    // -------------------------------------------------------------------------

    /// Write this directory and everything under it at the current stream
    /// position, patching offset slots as material lands.
    ///
    /// The next-directory link is left zero; the caller patches it through
    /// the returned [`DirPlacement`] when chaining a sibling.
    pub fn write_tree<S: Write + Seek>(
        &mut self,
        stream: &mut ByteStream<S>,
        origin: u64,
    ) -> Result<DirPlacement, TiffError> {
        self.normalize_storage_tags();

        align(stream, origin)?;
        let start = (stream.position()? - origin) as u32;

        // Entry table plan: plain tags merged with synthesized pointer
        // entries, ascending. A pointer tag shadows a plain tag of the
        // same number.
        let mut plan: Vec<(u16, Planned)> = self
            .entries
            .iter()
            .filter(|(t, _)| !self.children.contains_key(*t))
            .map(|(&t, v)| (t, Planned::Value(v)))
            .chain(
                self.children
                    .iter()
                    .filter(|(_, kids)| !kids.is_empty())
                    .map(|(&t, kids)| {
                        (
                            t,
                            Planned::Pointer {
                                count: kids.len() as u32,
                            },
                        )
                    }),
            )
            .collect();
        plan.sort_by_key(|&(t, _)| t);

        if plan.len() > MAX_DIR_ENTRIES as usize {
            return Err(TiffError::EntryCountTooLarge {
                count: plan.len().min(u16::MAX as usize) as u16,
                max: MAX_DIR_ENTRIES,
            });
        }
        stream.write_u16(plan.len() as u16)?;

        let byte_order = stream.byte_order();
        let has_thumbnail = self.thumbnail.is_some();
        let mut deferred: Vec<Deferred> = Vec::new();
        let mut pointer_slots: BTreeMap<u16, Vec<u64>> = BTreeMap::new();
        let mut storage_slots: BTreeMap<u16, Vec<u64>> = BTreeMap::new();

        for (t, planned) in plan {
            match planned {
                Planned::Pointer { count } => {
                    write_entry_header(stream, t, FieldType::Long, count)?;
                    let value_pos = stream.position()?;
                    stream.write_u32(0)?;
                    if count == 1 {
                        // Single child: the value field itself is the slot.
                        pointer_slots.insert(t, vec![value_pos]);
                    } else {
                        deferred.push(Deferred::PointerArray {
                            tag: t,
                            value_pos,
                            n: count,
                        });
                    }
                }
                Planned::Value(value) => {
                    if value.count() == 0 {
                        return Err(TiffError::ZeroCount { tag: t });
                    }
                    let payload = value.to_bytes(byte_order)?;
                    write_entry_header(stream, t, value.field_type(), value.count())?;
                    let value_pos = stream.position()?;
                    if value.fits_inline() {
                        let mut field = [0u8; 4];
                        field[..payload.len()].copy_from_slice(&payload);
                        stream.write_all(&field)?;
                        if has_thumbnail && is_storage_tag(t) {
                            storage_slots.insert(t, vec![value_pos]);
                        }
                    } else {
                        stream.write_u32(0)?;
                        deferred.push(Deferred::Payload {
                            tag: t,
                            value_pos,
                            payload,
                        });
                    }
                }
            }
        }

        let next_link = stream.position()?;
        stream.write_u32(0)?;

        // Trailing data area.
        for item in deferred {
            align(stream, origin)?;
            let data_offset = (stream.position()? - origin) as u32;
            match item {
                Deferred::Payload {
                    tag: t,
                    value_pos,
                    payload,
                } => {
                    stream.patch_u32(value_pos, data_offset)?;
                    let element_base = stream.position()?;
                    stream.write_all(&payload)?;
                    if has_thumbnail && is_storage_tag(t) {
                        let slots = (0..payload.len() as u64 / 4)
                            .map(|i| element_base + i * 4)
                            .collect();
                        storage_slots.insert(t, slots);
                    }
                }
                Deferred::PointerArray { tag: t, value_pos, n } => {
                    stream.patch_u32(value_pos, data_offset)?;
                    let element_base = stream.position()?;
                    for _ in 0..n {
                        stream.write_u32(0)?;
                    }
                    let slots = (0..n as u64).map(|i| element_base + i * 4).collect();
                    pointer_slots.insert(t, slots);
                }
            }
        }

        // Sub-IFD trees, depth-first. Children are not chained: their
        // next-directory links stay zero.
        for (t, kids) in self.children.iter_mut() {
            let Some(slots) = pointer_slots.get(t) else {
                continue;
            };
            for (i, child) in kids.iter_mut().enumerate() {
                let placement = child.write_tree(stream, origin)?;
                if let Some(&slot) = slots.get(i) {
                    stream.patch_u32(slot, placement.start)?;
                }
            }
        }

        // Thumbnail material last.
        match &self.thumbnail {
            Some(Thumbnail::Jpeg(blob)) => {
                align(stream, origin)?;
                let offset = (stream.position()? - origin) as u32;
                stream.write_all(blob)?;
                patch_slots(
                    stream,
                    storage_slots.get(&tag::JPEG_INTERCHANGE_FORMAT),
                    &[offset],
                )?;
                patch_slots(
                    stream,
                    storage_slots.get(&tag::JPEG_INTERCHANGE_FORMAT_LENGTH),
                    &[blob.len() as u32],
                )?;
            }
            Some(Thumbnail::Strips(image)) => {
                align(stream, origin)?;
                let rows_per_strip = self.tag_u32(tag::ROWS_PER_STRIP);
                let (offsets, counts) =
                    thumbnail::write_strips(image, stream, origin, rows_per_strip)?;
                patch_slots(stream, storage_slots.get(&tag::STRIP_OFFSETS), &offsets)?;
                patch_slots(stream, storage_slots.get(&tag::STRIP_BYTE_COUNTS), &counts)?;
            }
            None => {}
        }

        Ok(DirPlacement { start, next_link })
    }

    /// Reconcile the four image-storage tags with the thumbnail state so
    /// the entry table reserves exactly the slots the thumbnail writer
    /// will patch.
    fn normalize_storage_tags(&mut self) {
        enum Storage {
            Jpeg { length: u32 },
            Strips { strip_count: usize },
            None,
        }

        let storage = match &self.thumbnail {
            Some(Thumbnail::Jpeg(blob)) => Storage::Jpeg {
                length: blob.len() as u32,
            },
            Some(Thumbnail::Strips(image)) => Storage::Strips {
                strip_count: image.strip_count(self.tag_u32(tag::ROWS_PER_STRIP)),
            },
            None => Storage::None,
        };

        match storage {
            Storage::Jpeg { length } => {
                self.entries.remove(&tag::STRIP_OFFSETS);
                self.entries.remove(&tag::STRIP_BYTE_COUNTS);
                self.entries
                    .insert(tag::JPEG_INTERCHANGE_FORMAT, TagValue::long(0));
                self.entries
                    .insert(tag::JPEG_INTERCHANGE_FORMAT_LENGTH, TagValue::long(length));
            }
            Storage::Strips { strip_count } => {
                self.entries.remove(&tag::JPEG_INTERCHANGE_FORMAT);
                self.entries.remove(&tag::JPEG_INTERCHANGE_FORMAT_LENGTH);
                self.entries
                    .insert(tag::STRIP_OFFSETS, TagValue::Long(vec![0; strip_count]));
                self.entries.insert(
                    tag::STRIP_BYTE_COUNTS,
                    TagValue::Long(vec![0; strip_count]),
                );
            }
            Storage::None => {
                self.entries.remove(&tag::STRIP_OFFSETS);
                self.entries.remove(&tag::STRIP_BYTE_COUNTS);
                self.entries.remove(&tag::JPEG_INTERCHANGE_FORMAT);
                self.entries.remove(&tag::JPEG_INTERCHANGE_FORMAT_LENGTH);
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// The tags that address thumbnail material and get their values patched
/// by the thumbnail writer.
fn is_storage_tag(t: u16) -> bool {
    matches!(
        t,
        tag::STRIP_OFFSETS
            | tag::STRIP_BYTE_COUNTS
            | tag::JPEG_INTERCHANGE_FORMAT
            | tag::JPEG_INTERCHANGE_FORMAT_LENGTH
    )
}

/// Pad one zero byte when the position is odd relative to the origin.
fn align<S: Write + Seek>(stream: &mut ByteStream<S>, origin: u64) -> Result<(), TiffError> {
    if (stream.position()? - origin) % 2 == 1 {
        stream.write_u8(0)?;
    }
    Ok(())
}

fn write_entry_header<S: Write>(
    stream: &mut ByteStream<S>,
    tag: u16,
    field_type: FieldType,
    count: u32,
) -> Result<(), TiffError> {
    stream.write_u16(tag)?;
    stream.write_u16(field_type as u16)?;
    stream.write_u32(count)?;
    Ok(())
}

fn patch_slots<S: Write + Seek>(
    stream: &mut ByteStream<S>,
    slots: Option<&Vec<u64>>,
    values: &[u32],
) -> Result<(), TiffError> {
    if let Some(slots) = slots {
        for (&slot, &value) in slots.iter().zip(values.iter()) {
            stream.patch_u32(slot, value)?;
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
