//! Chapter records from a sparse list of chapter-start pages.
//!
//! Boundary rule: each chapter ends one page before the next start. The last
//! real chapter ends at `total_pages - 1`, which leaves the final page to a
//! synthetic back-matter chapter, unless an explicit last-chapter end is
//! given. Pages before the first start become front matter (chapter 0).

use book_model::{Chapter, ChapterKind, PageOffset};
use tracing::debug;

use crate::page_numbering::printed_page;

pub const FRONT_MATTER_TITLE: &str = "Front Matter";
pub const BACK_MATTER_TITLE: &str = "Back Matter";

/// Derive chapters using the default end-page rule.
pub fn derive_chapters(starts: &[u32], titles: &[String], total_pages: u32, offset: PageOffset) -> Vec<Chapter> {
    derive_chapters_with_end(starts, titles, total_pages, None, offset)
}

/// Derive chapters; `last_chapter_end` (physical) overrides where the final
/// real chapter stops. Returns an empty list for an empty start list.
pub fn derive_chapters_with_end(
    starts: &[u32],
    titles: &[String],
    total_pages: u32,
    last_chapter_end: Option<u32>,
    offset: PageOffset,
) -> Vec<Chapter> {
    let mut starts: Vec<u32> = starts.iter().copied().filter(|&p| p >= 1).collect();
    starts.sort_unstable();
    starts.dedup();
    let (first, last) = match (starts.first(), starts.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return Vec::new(),
    };
    // Upstream validation keeps starts within the document; never produce end < start.
    let total_pages = total_pages.max(last);

    let mut chapters = Vec::with_capacity(starts.len() + 2);
    if first > 1 {
        chapters.push(make_chapter(0, FRONT_MATTER_TITLE.into(), ChapterKind::FrontMatter, 1, first - 1, offset));
    }

    for (i, &start) in starts.iter().enumerate() {
        let number = i as u32 + 1;
        let end = match starts.get(i + 1) {
            Some(&next) => next - 1,
            None => last_body_end(start, total_pages, last_chapter_end),
        };
        let title = titles
            .get(i)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Chapter::default_title(number));
        chapters.push(make_chapter(number, title, ChapterKind::Body, start, end, offset));
    }

    let body_end = chapters.last().map(|c| c.physical_end).unwrap_or(total_pages);
    if body_end < total_pages {
        let number = starts.len() as u32 + 1;
        chapters.push(make_chapter(number, BACK_MATTER_TITLE.into(), ChapterKind::BackMatter, body_end + 1, total_pages, offset));
    }

    debug!(chapters = chapters.len(), total_pages, offset = offset.get(), "derived chapter boundaries");
    chapters
}

fn last_body_end(start: u32, total_pages: u32, explicit: Option<u32>) -> u32 {
    match explicit {
        Some(end) => end.clamp(start, total_pages),
        None => total_pages.saturating_sub(1).max(start),
    }
}

fn make_chapter(number: u32, title: String, kind: ChapterKind, start: u32, end: u32, offset: PageOffset) -> Chapter {
    Chapter {
        number,
        title,
        kind,
        physical_start: start,
        physical_end: end,
        printed_start: printed_page(start, offset),
        printed_end: printed_page(end, offset),
        page_offset: offset,
        description: None,
        char_count: 0,
        content_path: None,
    }
}

/// Attach descriptions to real chapters in order. Synthetic chapters and
/// blank descriptions are skipped; extra descriptions are ignored.
pub fn apply_descriptions(chapters: &mut [Chapter], descriptions: &[String]) {
    let body = chapters.iter_mut().filter(|c| c.kind == ChapterKind::Body);
    for (chapter, desc) in body.zip(descriptions) {
        let desc = desc.trim();
        if !desc.is_empty() {
            chapter.description = Some(desc.to_string());
        }
    }
}
