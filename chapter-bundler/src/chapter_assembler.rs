//! Per-chapter text files with page-level provenance markers.

use std::fs;
use std::path::{Path, PathBuf};

use book_model::Chapter;
use encoding_rs::Encoding;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::BundleError;
use crate::page_numbering::{page_marker, PageSpan};
use crate::page_text::{decode_text_bytes, normalize_newlines, Decoded, PageContent, PageTextSource};

const HEADER_RULE_WIDTH: usize = 80;
const PAGE_RULE_WIDTH: usize = 40;

/// How the pages of one chapter were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub written: usize,
    pub missing: usize,
    pub undecodable: usize,
    pub unreadable: usize,
    pub fallback_decoded: usize,
}

impl PageStats {
    /// Pages that ended up as a placeholder.
    pub fn placeholders(&self) -> usize { self.missing + self.undecodable + self.unreadable }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledChapter {
    pub number: u32,
    pub path: PathBuf,
    /// Characters of page text, markers and placeholders excluded.
    pub char_count: usize,
    pub pages: PageStats,
}

/// Render the chapter file body: text, character weight and page statistics.
pub fn render_chapter_text(
    chapter: &Chapter,
    source: &dyn PageTextSource,
    fallback: &'static Encoding,
) -> (String, usize, PageStats) {
    let header_rule = "=".repeat(HEADER_RULE_WIDTH);
    let page_rule = "=".repeat(PAGE_RULE_WIDTH);
    let mut out = String::new();
    let mut stats = PageStats::default();
    let mut char_count = 0usize;

    out.push_str(&header_rule);
    out.push('\n');
    out.push_str(&chapter.title);
    out.push('\n');
    out.push_str(&PageSpan::of_chapter(chapter).heading_label());
    out.push('\n');
    out.push_str(&header_rule);
    out.push_str("\n\n");

    for page in chapter.pages() {
        let marker = page_marker(page, chapter.page_offset);
        out.push('\n');
        out.push_str(&page_rule);
        out.push_str(&format!("\n[BEGIN {marker}]\n"));
        out.push_str(&page_rule);
        out.push_str("\n\n");

        match resolve_page(page, source.fetch(page), fallback, &mut stats) {
            Ok(text) => {
                char_count += text.chars().count();
                out.push_str(&text);
            }
            Err(placeholder) => out.push_str(&placeholder),
        }

        out.push_str("\n\n");
        out.push_str(&page_rule);
        out.push_str(&format!("\n[END {marker}]\n"));
        out.push_str(&page_rule);
        out.push('\n');
    }
    (out, char_count, stats)
}

/// Page text, or the placeholder line that stands in for it.
fn resolve_page(
    page: u32,
    content: PageContent,
    fallback: &'static Encoding,
    stats: &mut PageStats,
) -> Result<String, String> {
    match content {
        PageContent::Text(text) => {
            stats.written += 1;
            Ok(normalize_newlines(&text))
        }
        PageContent::Bytes(bytes) => match decode_text_bytes(&bytes, fallback) {
            Decoded::Utf8(text) => {
                stats.written += 1;
                Ok(text)
            }
            Decoded::Fallback(text) => {
                debug!(page, encoding = fallback.name(), "page decoded with fallback encoding");
                stats.written += 1;
                stats.fallback_decoded += 1;
                Ok(text)
            }
            Decoded::Undecodable => {
                warn!(page, encoding = fallback.name(), "page text could not be decoded");
                stats.undecodable += 1;
                Err(format!("[WARNING: Page {page} content could not be decoded]\n"))
            }
        },
        PageContent::Missing => {
            warn!(page, "page text not found");
            stats.missing += 1;
            Err(format!("[WARNING: Page {page} content not found]\n"))
        }
        PageContent::Unreadable(reason) => {
            warn!(page, %reason, "page text could not be read");
            stats.unreadable += 1;
            Err(format!("[WARNING: Page {page} content could not be read]\n"))
        }
    }
}

/// Assemble one chapter into `out_path`. Only output I/O is fatal.
pub fn assemble_chapter(
    chapter: &Chapter,
    source: &dyn PageTextSource,
    out_path: &Path,
    fallback: &'static Encoding,
) -> Result<AssembledChapter, BundleError> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BundleError::io(format!("create chapter {} directory", chapter.number), parent, e))?;
    }
    let (text, char_count, pages) = render_chapter_text(chapter, source, fallback);
    fs::write(out_path, text).map_err(|e| BundleError::io(format!("write chapter {}", chapter.number), out_path, e))?;
    debug!(chapter = chapter.number, char_count, placeholders = pages.placeholders(), "chapter assembled");
    Ok(AssembledChapter { number: chapter.number, path: out_path.to_path_buf(), char_count, pages })
}

/// Assemble every chapter, each to the path chosen by `path_for`.
/// Results are returned in chapter order; each worker owns exactly one output file.
pub fn assemble_chapters<F>(
    chapters: &[Chapter],
    source: &dyn PageTextSource,
    path_for: F,
    fallback: &'static Encoding,
    worker_threads: Option<usize>,
) -> Vec<Result<AssembledChapter, BundleError>>
where
    F: Fn(&Chapter) -> PathBuf + Sync,
{
    let run = || {
        chapters
            .par_iter()
            .map(|ch| assemble_chapter(ch, source, &path_for(ch), fallback))
            .collect::<Vec<_>>()
    };
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = worker_threads.filter(|&n| n > 0) {
        builder = builder.num_threads(n);
    }
    match builder.build() {
        Ok(pool) => pool.install(run),
        Err(e) => {
            warn!(error = %e, "assembly thread pool unavailable; assembling sequentially");
            chapters.iter().map(|ch| assemble_chapter(ch, source, &path_for(ch), fallback)).collect()
        }
    }
}
