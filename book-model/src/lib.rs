//! Shared models used across crates

use std::ops::RangeInclusive;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Major version of the serialized job/manifest layout.
pub const SCHEMA_MAJOR: u16 = 1;

/// Number of physical pages that precede printed page 1 of the book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageOffset(pub u32);

impl PageOffset {
    pub const NONE: PageOffset = PageOffset(0);

    pub fn new(pages: u32) -> Self { Self(pages) }

    pub fn get(self) -> u32 { self.0 }

    /// True when printed numbers differ from physical ones.
    pub fn is_dual(self) -> bool { self.0 > 0 }

    /// Physical page showing printed page `printed`.
    pub fn physical_of(self, printed: i64) -> i64 { printed + i64::from(self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterKind {
    /// Synthetic chapter 0 covering pages before the first declared start.
    FrontMatter,
    Body,
    /// Synthetic chapter N+1 covering pages after the last real chapter.
    BackMatter,
}

/// A contiguous physical-page range of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 0 for front matter, 1..=N for real chapters, N+1 for back matter.
    pub number: u32,
    pub title: String,
    pub kind: ChapterKind,
    /// Inclusive physical bounds (1-based, document order).
    pub physical_start: u32,
    pub physical_end: u32,
    /// Inclusive printed bounds; may be <= 0 inside the offset region.
    pub printed_start: i64,
    pub printed_end: i64,
    pub page_offset: PageOffset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Characters of page text written by the assembler (partition weight).
    #[serde(default)]
    pub char_count: usize,
    /// Assembled chapter text; set by the assembler, read-only afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<PathBuf>,
}

impl Chapter {
    pub fn default_title(number: u32) -> String { format!("Chapter {number}") }

    pub fn pages(&self) -> RangeInclusive<u32> { self.physical_start..=self.physical_end }

    pub fn page_count(&self) -> u32 { self.physical_end.saturating_sub(self.physical_start).saturating_add(1) }

    pub fn uses_dual_numbering(&self) -> bool { self.page_offset.is_dual() }
}

/// A contiguous run of chapters that becomes one bundle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterGroup {
    /// Zero-padded ordinal, e.g. "01".
    pub label: String,
    /// Chapter numbers in reading order; never empty.
    pub chapters: Vec<u32>,
    /// "Chapter 3" or "Chapters 3–7".
    pub description: String,
}

impl ChapterGroup {
    pub fn contains(&self, number: u32) -> bool { self.chapters.contains(&number) }
}

/// Inputs for one bundling run, as handed over by the input-collection step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookJob {
    pub title: Option<String>,
    /// Physical page count of the source document.
    pub total_pages: u32,
    pub page_offset: u32,
    /// Chapter start pages, ascending. Physical unless `starts_are_printed`.
    pub chapter_starts: Vec<u32>,
    pub chapter_titles: Vec<String>,
    pub chapter_descriptions: Vec<String>,
    /// Optional last page of the final chapter (same numbering as the starts).
    pub last_chapter_end: Option<u32>,
    /// When true, starts and `last_chapter_end` are printed page numbers.
    pub starts_are_printed: bool,
}

impl BookJob {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(s) }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> { serde_json::to_string_pretty(self) }

    pub fn offset(&self) -> PageOffset { PageOffset(self.page_offset) }

    fn to_physical(&self, page: u32) -> u32 {
        if !self.starts_are_printed {
            return page;
        }
        u32::try_from(self.offset().physical_of(i64::from(page))).unwrap_or(u32::MAX)
    }

    /// Chapter start pages in physical numbering.
    pub fn physical_starts(&self) -> Vec<u32> {
        self.chapter_starts.iter().map(|&p| self.to_physical(p)).collect()
    }

    pub fn physical_last_end(&self) -> Option<u32> {
        self.last_chapter_end.map(|p| self.to_physical(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Chapter,
    Bundle,
    Index,
    Instructions,
}

/// One produced file, as seen by the archival step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Listing of every artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub schema_version: u16,
    pub book_title: Option<String>,
    pub chapter_count: usize,
    pub bundle_count: usize,
    pub dual_numbering: bool,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub entries: Vec<ManifestEntry>,
}

impl BundleManifest {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> { serde_json::to_string_pretty(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_parses_with_defaults() {
        let job = BookJob::from_json_str(r#"{ "total_pages": 30, "chapter_starts": [1, 10, 25] }"#).unwrap();
        assert_eq!(job.total_pages, 30);
        assert_eq!(job.offset(), PageOffset::NONE);
        assert!(job.chapter_titles.is_empty());
        assert_eq!(job.last_chapter_end, None);
        assert_eq!(job.physical_starts(), vec![1, 10, 25]);
    }

    #[test]
    fn printed_starts_are_shifted_by_offset() {
        let job = BookJob {
            total_pages: 40,
            page_offset: 4,
            chapter_starts: vec![1, 11],
            last_chapter_end: Some(30),
            starts_are_printed: true,
            ..Default::default()
        };
        assert_eq!(job.physical_starts(), vec![5, 15]);
        assert_eq!(job.physical_last_end(), Some(34));
    }

    #[test]
    fn chapter_page_helpers() {
        let ch = Chapter {
            number: 2,
            title: Chapter::default_title(2),
            kind: ChapterKind::Body,
            physical_start: 15,
            physical_end: 19,
            printed_start: 11,
            printed_end: 15,
            page_offset: PageOffset(4),
            description: None,
            char_count: 0,
            content_path: None,
        };
        assert_eq!(ch.title, "Chapter 2");
        assert_eq!(ch.page_count(), 5);
        assert_eq!(ch.pages().collect::<Vec<_>>(), vec![15, 16, 17, 18, 19]);
        assert!(ch.uses_dual_numbering());

        let edge = Chapter { physical_start: 1, physical_end: u32::MAX, ..ch };
        assert_eq!(edge.page_count(), u32::MAX);
    }

    #[test]
    fn offset_maps_printed_to_physical() {
        assert_eq!(PageOffset(4).physical_of(1), 5);
        assert_eq!(PageOffset(4).physical_of(-3), 1);
        assert_eq!(PageOffset::NONE.physical_of(9), 9);
        let job = BookJob {
            page_offset: 1,
            chapter_starts: vec![u32::MAX],
            starts_are_printed: true,
            ..Default::default()
        };
        assert_eq!(job.physical_starts(), vec![u32::MAX]);
    }
}
