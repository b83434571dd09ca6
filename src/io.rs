use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;

use crate::constants::*;
use crate::error::{Result, VmError};
use crate::frames::FrameAllocator;
use crate::memory::{FrameRef, MemoryStore};

/// Segment table record from the first init line: (s, length, pt location)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRecord {
    pub segment: u32,
    pub length: u32,
    pub page_table: FrameRef,
}

/// Page table record from the second init line: (s, p, page location)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRecord {
    pub segment: u32,
    pub page: u32,
    pub frame: FrameRef,
}

#[derive(Debug, Default)]
pub struct InitData {
    pub segments: Vec<SegmentRecord>,
    pub pages: Vec<PageRecord>,
    source_name: String,
}

impl InitData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| VmError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_named(content, "<init>")
    }

    fn parse_named(content: &str, source_name: &str) -> Result<Self> {
        let mut lines = content.lines();

        let st_line = lines
            .next()
            .ok_or_else(|| VmError::malformed(source_name, 1, "init file is empty"))?;
        let segments = parse_triplets(st_line, source_name, 1)?
            .into_iter()
            .map(|(s, z, f)| segment_record(s, z, f, source_name))
            .collect::<Result<Vec<_>>>()?;

        let pages = match lines.next() {
            Some(pt_line) => parse_triplets(pt_line, source_name, 2)?
                .into_iter()
                .map(|(s, p, f)| page_record(s, p, f, source_name))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(InitData {
            segments,
            pages,
            source_name: source_name.to_string(),
        })
    }

    /// Load the records into memory and reserve every resident frame they
    /// name. Segment records go first so page records can find their
    /// page table, in a frame or in a disk block. A segment or page named
    /// twice is rejected, since the first record's frame would stay
    /// reserved with nothing referencing it.
    pub fn apply(&self, store: &mut MemoryStore, frames: &mut FrameAllocator) -> Result<()> {
        let mut seen_segments = HashSet::new();
        for rec in &self.segments {
            if !seen_segments.insert(rec.segment) {
                return Err(VmError::malformed(
                    &self.source_name,
                    1,
                    format!("segment {} is defined more than once", rec.segment),
                ));
            }
            store.set_segment_entry(rec.segment, rec.length, rec.page_table);
            self.reserve(frames, rec.page_table, 1)?;
        }

        let mut seen_pages = HashSet::new();
        for rec in &self.pages {
            if !seen_pages.insert((rec.segment, rec.page)) {
                return Err(VmError::malformed(
                    &self.source_name,
                    2,
                    format!(
                        "segment {} page {} is defined more than once",
                        rec.segment, rec.page
                    ),
                ));
            }
            match store.segment_page_table_location(rec.segment) {
                FrameRef::Resident(pt_frame) => {
                    store.set_page_table_entry(pt_frame, rec.page, rec.frame)
                }
                FrameRef::OnDisk(block) => {
                    store.set_disk_page_table_entry(block, rec.page, rec.frame)
                }
                FrameRef::Unset => {
                    return Err(VmError::malformed(
                        &self.source_name,
                        2,
                        format!("segment {} has no page table", rec.segment),
                    ));
                }
            }
            self.reserve(frames, rec.frame, 2)?;
        }

        debug!(
            "applied {} segment and {} page records, {} frames free",
            self.segments.len(),
            self.pages.len(),
            frames.free_count()
        );
        Ok(())
    }

    fn reserve(&self, frames: &mut FrameAllocator, location: FrameRef, line: usize) -> Result<()> {
        match location {
            FrameRef::Resident(frame) => frames.reserve(frame).map_err(|err| {
                VmError::malformed(
                    &self.source_name,
                    line,
                    format!("free frame list refused frame {frame}: {err}"),
                )
            }),
            FrameRef::OnDisk(_) | FrameRef::Unset => Ok(()),
        }
    }
}

fn parse_triplets(line: &str, source_name: &str, line_no: usize) -> Result<Vec<(i32, i32, i32)>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() % 3 != 0 {
        return Err(VmError::malformed(
            source_name,
            line_no,
            format!("{} tokens, expected a multiple of 3", tokens.len()),
        ));
    }

    let parse = |token: &str| {
        token.parse::<i32>().map_err(|_| {
            VmError::malformed(source_name, line_no, format!("invalid integer: {token}"))
        })
    };

    tokens
        .chunks(3)
        .map(|chunk| -> Result<(i32, i32, i32)> {
            Ok((parse(chunk[0])?, parse(chunk[1])?, parse(chunk[2])?))
        })
        .collect()
}

fn segment_record(s: i32, z: i32, f: i32, source_name: &str) -> Result<SegmentRecord> {
    let segment = segment_number(s, source_name, 1)?;
    if z < 0 {
        return Err(VmError::malformed(
            source_name,
            1,
            format!("negative length {z} for segment {s}"),
        ));
    }
    let page_table = location(f, source_name, 1)?;
    if page_table == FrameRef::Unset {
        return Err(VmError::malformed(
            source_name,
            1,
            format!("segment {s} page table location 0 is in the segment table"),
        ));
    }
    Ok(SegmentRecord {
        segment,
        length: z as u32,
        page_table,
    })
}

fn page_record(s: i32, p: i32, f: i32, source_name: &str) -> Result<PageRecord> {
    let segment = segment_number(s, source_name, 2)?;
    if p < 0 || p as usize >= PT_SIZE {
        return Err(VmError::malformed(
            source_name,
            2,
            format!("page number {p} outside 0..{}", PT_SIZE - 1),
        ));
    }
    let frame = location(f, source_name, 2)?;
    if frame == FrameRef::Unset {
        return Err(VmError::malformed(
            source_name,
            2,
            format!("segment {s} page {p} location 0 is in the segment table"),
        ));
    }
    Ok(PageRecord {
        segment,
        page: p as u32,
        frame,
    })
}

fn segment_number(s: i32, source_name: &str, line: usize) -> Result<u32> {
    if s < 0 || s as usize >= MAX_SEGMENTS {
        return Err(VmError::malformed(
            source_name,
            line,
            format!("segment number {s} outside 0..{}", MAX_SEGMENTS - 1),
        ));
    }
    Ok(s as u32)
}

fn location(raw: i32, source_name: &str, line: usize) -> Result<FrameRef> {
    let location = FrameRef::from_raw(raw);
    let in_range = match location {
        FrameRef::Resident(frame) => (frame as usize) < NUM_FRAMES,
        FrameRef::OnDisk(block) => (block as usize) < DISK_BLOCKS,
        FrameRef::Unset => true,
    };
    if !in_range {
        return Err(VmError::malformed(
            source_name,
            line,
            format!("{location} is out of range"),
        ));
    }
    Ok(location)
}

pub fn read_virtual_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| VmError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_virtual_addresses(&content, &path.display().to_string())
}

pub fn parse_virtual_addresses(content: &str, source_name: &str) -> Result<Vec<u32>> {
    content
        .split_whitespace()
        .map(|token| {
            token.parse::<u32>().map_err(|_| VmError::MalformedAddress {
                source_name: source_name.to_string(),
                token: token.to_string(),
            })
        })
        .collect()
}

pub fn format_results(results: &[i32]) -> String {
    let output: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    output.join(" ")
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[i32]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, format_results(results)).map_err(|source| VmError::Write {
        path: path.to_path_buf(),
        source,
    })
}
