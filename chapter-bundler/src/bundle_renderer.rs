//! Bundle files, the bundle index and the instructions document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use book_model::{Chapter, ChapterGroup};
use chrono::NaiveDate;
use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::error::BundleError;
use crate::layout::bundle_file_name;
use crate::page_numbering::PageSpan;
use crate::page_text::{decode_text_bytes, Decoded};

/// Used in the instructions when the job carries no title.
pub const UNTITLED_BOOK: &str = "Untitled Book";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBundle {
    pub label: String,
    pub path: PathBuf,
    /// Member chapters replaced by a placeholder.
    pub placeholders: usize,
}

/// Members of `group`, in the group's order.
fn members<'a>(group: &ChapterGroup, chapters: &'a [Chapter]) -> Vec<&'a Chapter> {
    group.chapters.iter().filter_map(|n| chapters.iter().find(|c| c.number == *n)).collect()
}

/// `combined_01.txt - Chapters 1–3 (Pages 1-29)`
pub fn bundle_header(group: &ChapterGroup, chapters: &[Chapter]) -> String {
    let name = bundle_file_name(&group.label);
    match PageSpan::covering(members(group, chapters)) {
        Some(span) => format!("{name} - {} ({})", group.description, span.bundle_label()),
        None => format!("{name} - {}", group.description),
    }
}

fn chapter_content(chapter: &Chapter, fallback: &'static Encoding) -> Result<String, String> {
    let n = chapter.number;
    let not_found = || format!("[WARNING: Chapter {n} content not found]");
    let Some(path) = chapter.content_path.as_deref() else {
        return Err(not_found());
    };
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            warn!(chapter = n, path = %path.display(), error = %e, "chapter content could not be read");
            return Err(format!("[WARNING: Chapter {n} content could not be read]"));
        }
    };
    match decode_text_bytes(&bytes, fallback) {
        Decoded::Utf8(text) | Decoded::Fallback(text) => Ok(text),
        Decoded::Undecodable => Err(format!("[WARNING: Chapter {n} content could not be decoded]")),
    }
}

/// Bundle text and the number of members that became placeholders.
pub fn render_bundle_text(group: &ChapterGroup, chapters: &[Chapter], fallback: &'static Encoding) -> (String, usize) {
    let mut out = bundle_header(group, chapters);
    out.push_str("\n\n");
    let mut placeholders = 0;
    for &number in &group.chapters {
        let content = match chapters.iter().find(|c| c.number == number) {
            Some(ch) => chapter_content(ch, fallback),
            None => Err(format!("[WARNING: Chapter {number} content not found]")),
        };
        match content {
            Ok(text) => out.push_str(&text),
            Err(placeholder) => {
                warn!(bundle = %group.label, chapter = number, "{placeholder}");
                placeholders += 1;
                out.push_str(&placeholder);
            }
        }
        out.push_str("\n\n");
    }
    (out, placeholders)
}

pub fn write_bundle(
    group: &ChapterGroup,
    chapters: &[Chapter],
    path: &Path,
    fallback: &'static Encoding,
) -> Result<RenderedBundle, BundleError> {
    let (text, placeholders) = render_bundle_text(group, chapters, fallback);
    write_artifact(path, &text, &format!("write bundle {}", group.label))?;
    debug!(bundle = %group.label, path = %path.display(), "bundle written");
    Ok(RenderedBundle { label: group.label.clone(), path: path.to_path_buf(), placeholders })
}

pub fn render_index_text(groups: &[ChapterGroup], chapters: &[Chapter], book_title: Option<&str>, date: NaiveDate) -> String {
    let mut out = String::new();
    match book_title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => out.push_str(&format!("{title} - Combined Chapter Files Index\n")),
        None => out.push_str("Combined Chapter Files Index\n"),
    }
    out.push_str(&format!("Last Updated: {}\n\n", date.format("%Y-%m-%d")));

    for group in groups {
        let group_members = members(group, chapters);
        if group_members.is_empty() {
            continue;
        }
        out.push_str(&bundle_header(group, chapters));
        out.push('\n');
        for ch in group_members {
            out.push_str(&format!("    {} ({})\n", ch.title, PageSpan::of_chapter(ch).index_label()));
            if let Some(desc) = ch.description.as_deref().filter(|d| !d.is_empty()) {
                for line in desc.lines() {
                    out.push_str(&format!("        {line}\n"));
                }
            }
        }
        out.push('\n');
    }
    out
}

pub fn write_index(
    groups: &[ChapterGroup],
    chapters: &[Chapter],
    book_title: Option<&str>,
    date: NaiveDate,
    path: &Path,
) -> Result<(), BundleError> {
    write_artifact(path, &render_index_text(groups, chapters, book_title, date), "write index")
}

/// Usage instructions for an assistant reading the bundles.
pub fn render_instructions_text(book_title: &str, bundle_count: usize, chapter_count: usize, dual_numbering: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "You are a subject matter expert on *{book_title}*, using {bundle_count} uploaded text files \
         (combined_01.txt to combined_{bundle_count:02}.txt), each containing one or more of \
         the book's {chapter_count} chapters, and an index file (index.txt) mapping chapters to their \
         respective files.\n\n"
    ));
    out.push_str("You must follow this non-negotiable, three-step workflow for every query:\n\n");
    out.push_str(
        "1. **READ index.txt FIRST**: Immediately open index.txt to identify the correct chapter(s) \
         (and their combined file if needed) for the user's query using keywords, chapter titles, \
         or subtopics. Never search other files without this mapping. Example: \"budget planning\" → \
         Chapter 8 → combined_02.txt; \"marketing\" → Chapter 11 → combined_03.txt.\n",
    );
    out.push_str(
        "2. **SEARCH ONLY THE RELEVANT CHAPTERS**: Search strictly within the identified chapter(s) \
         and corresponding file(s), using [BEGIN PAGE X] and [END PAGE X] markers to locate content.\n",
    );
    if dual_numbering {
        out.push_str(
            "3. **RESPOND WITH PRECISE DUAL-FORMAT CITATIONS**: Quote or paraphrase only from the relevant \
             chapter(s), citing the chapter and the narrowest possible page range that directly covers \
             the topic. You MUST include BOTH page numbering systems in every citation \
             (e.g., \"Source: Chapter 8, Book Pages 75-77, PDF Pages 85-87\"). \
             Broad or generic page citations are not acceptable.\n\n",
        );
    } else {
        out.push_str(
            "3. **RESPOND WITH PRECISE CITATIONS**: Quote or paraphrase only from the relevant chapter(s), \
             citing the chapter and the narrowest possible page range that directly covers the topic \
             (e.g., \"Source: Chapter 8, Pages 85–87\"). Broad or generic page citations are not acceptable.\n\n",
        );
    }
    out.push_str(
        "**Diagnostic Output Requirement:** Every response must include the statement: \
         \"Index consulted: [list of chapter(s) identified, e.g., Chapter 8].\"\n\n",
    );

    out.push_str("**What You Must Not Do:**\n");
    out.push_str("- Do NOT use external information or make assumptions not present in the files.\n");
    out.push_str("- Do NOT reference visuals or diagrams, as this is a text-only source.\n");
    out.push_str("- Do NOT cite incorrect chapters (e.g., citing Chapter 10 for marketing).\n");
    if dual_numbering {
        out.push_str(
            "- Do NOT use overly broad citations (e.g., Book Pages 75-98, PDF Pages 85-108). \
             Use only the minimal span of pages necessary.\n",
        );
        out.push_str("- Do NOT omit either page numbering system in citations. ALWAYS include both Book Pages and PDF Pages.\n\n");
    } else {
        out.push_str("- Do NOT use overly broad citations (e.g., Pages 75-98). Use only the minimal span of pages necessary.\n\n");
    }

    out.push_str("**Tasks Supported:**\n");
    out.push_str("- Answer questions with pinpoint accuracy.\n");
    out.push_str("- Summarize chapters or topics clearly.\n");
    out.push_str("- Create flashcards or multiple-choice quizzes with source citations.\n");
    out.push_str("- Explain techniques or concepts using clear language from the text.\n");
    out.push_str(&format!(
        "- If a topic is not found in the {chapter_count} chapters, state: \"This information is not covered in {book_title}.\"\n\n"
    ));

    out.push_str("**Document Structure Reminder:**\n");
    out.push_str("- File headers show chapter ranges.\n");
    out.push_str("- Chapter markers specify chapter number, title, and page range.\n");
    if dual_numbering {
        out.push_str("- This book uses two page numbering systems: Book Pages (printed) and PDF Pages (file).\n");
        out.push_str("- Page markers show: [BEGIN PAGE 25 (Book Page 15)] means PDF page 25 is page 15.\n");
        out.push_str(
            "- When citing pages, you MUST ALWAYS include both numbering systems \
             (e.g., 'Book Pages 15-20, PDF Pages 25-30'). This is required.\n",
        );
        out.push_str("- Pages are clearly marked: [BEGIN PAGE X (Book Page Y)] / [END PAGE X (Book Page Y)].\n\n");
        out.push_str(&format!(
            "Your mission is to deliver accurate, sourced responses from *{book_title}*. \
             Use narrow page ranges and include both Book Pages and PDF Pages in citations."
        ));
    } else {
        out.push_str("- Pages are clearly marked: [BEGIN PAGE X] / [END PAGE X].\n\n");
        out.push_str(&format!(
            "Your mission is to deliver accurate, sourced responses from *{book_title}*. \
             Use narrow page ranges in citations."
        ));
    }
    out
}

pub fn write_instructions(
    book_title: &str,
    bundle_count: usize,
    chapter_count: usize,
    dual_numbering: bool,
    path: &Path,
) -> Result<(), BundleError> {
    let text = render_instructions_text(book_title, bundle_count, chapter_count, dual_numbering);
    write_artifact(path, &text, "write instructions")
}

pub(crate) fn write_artifact(path: &Path, text: &str, context: &str) -> Result<(), BundleError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BundleError::io(format!("{context}: create directory"), parent, e))?;
    }
    fs::write(path, text).map_err(|e| BundleError::io(context, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter_bounds::derive_chapters;
    use book_model::PageOffset;

    fn group(label: &str, chapters: Vec<u32>, description: &str) -> ChapterGroup {
        ChapterGroup { label: label.into(), chapters, description: description.into() }
    }

    fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 9).unwrap() }

    #[test]
    fn header_shows_span_in_the_right_numbering() {
        let plain = derive_chapters(&[1, 10, 25], &[], 30, PageOffset::NONE);
        let g = group("01", vec![1, 2], "Chapters 1–2");
        assert_eq!(bundle_header(&g, &plain), "combined_01.txt - Chapters 1–2 (Pages 1-24)");

        let dual = derive_chapters(&[5, 15], &[], 20, PageOffset(4));
        let g = group("02", vec![1, 2], "Chapters 1–2");
        assert_eq!(bundle_header(&g, &dual), "combined_02.txt - Chapters 1–2 (Book Pages 1-15, PDF Pages 5-19)");
    }

    #[test]
    fn bundle_concatenates_members_and_marks_missing_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let mut chs = derive_chapters(&[1, 10, 25], &[], 30, PageOffset::NONE);
        let p1 = tmp.path().join("chapter_01.txt");
        std::fs::write(&p1, "first chapter body").unwrap();
        chs[0].content_path = Some(p1);
        chs[1].content_path = Some(tmp.path().join("gone.txt"));
        let g = group("01", vec![1, 2, 3], "Chapters 1–3");

        let (text, placeholders) = render_bundle_text(&g, &chs, encoding_rs::WINDOWS_1252);
        assert!(text.starts_with("combined_01.txt - Chapters 1–3 (Pages 1-29)\n\nfirst chapter body\n\n"));
        assert!(text.contains("[WARNING: Chapter 2 content not found]\n\n[WARNING: Chapter 3"));
        assert!(text.contains("[WARNING: Chapter 3 content not found]"));
        assert_eq!(placeholders, 2);
    }

    #[test]
    fn bundle_decodes_legacy_bytes_and_flags_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let mut chs = derive_chapters(&[1, 10], &[], 12, PageOffset::NONE);
        let p1 = tmp.path().join("a.txt");
        let p2 = tmp.path().join("b.txt");
        std::fs::write(&p1, [0x41, 0x81]).unwrap();
        std::fs::write(&p2, "ok").unwrap();
        chs[0].content_path = Some(p1);
        chs[1].content_path = Some(p2);
        let g = group("01", vec![1, 2], "Chapters 1–2");
        let (text, placeholders) = render_bundle_text(&g, &chs, encoding_rs::SHIFT_JIS);
        assert!(text.contains("[WARNING: Chapter 1 content could not be decoded]"));
        assert!(text.contains("ok\n\n"));
        assert_eq!(placeholders, 1);
    }

    #[test]
    fn index_lists_bundles_chapters_and_descriptions() {
        let mut chs = derive_chapters(&[5, 15], &["Intro".into(), "Methods".into()], 20, PageOffset(4));
        chs[1].description = Some("Why it matters\nWho it is for".into());
        let groups = vec![group("01", vec![0, 1], "Chapters 0–1"), group("02", vec![2, 3], "Chapters 2–3")];
        let text = render_index_text(&groups, &chs, Some("Field Guide"), date());
        let expected = "Field Guide - Combined Chapter Files Index\n\
            Last Updated: 2024-03-09\n\n\
            combined_01.txt - Chapters 0–1 (Book Pages -3-10, PDF Pages 1-14)\n    \
            Front Matter (Book p.-3-0, PDF p.1-4)\n    \
            Intro (Book p.1-10, PDF p.5-14)\n        \
            Why it matters\n        \
            Who it is for\n\n\
            combined_02.txt - Chapters 2–3 (Book Pages 11-16, PDF Pages 15-20)\n    \
            Methods (Book p.11-15, PDF p.15-19)\n    \
            Back Matter (Book p.16-16, PDF p.20-20)\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn untitled_index_header() {
        let chs = derive_chapters(&[1], &[], 3, PageOffset::NONE);
        let groups = vec![group("01", vec![1, 2], "Chapters 1–2")];
        let text = render_index_text(&groups, &chs, None, date());
        assert!(text.starts_with("Combined Chapter Files Index\nLast Updated: 2024-03-09\n\n"));
        assert!(text.contains("    Chapter 1 (p.1-2)\n"));
    }

    #[test]
    fn instructions_switch_on_dual_numbering() {
        let dual = render_instructions_text("Field Guide", 3, 12, true);
        assert!(dual.starts_with("You are a subject matter expert on *Field Guide*, using 3 uploaded text files (combined_01.txt to combined_03.txt)"));
        assert!(dual.contains("the book's 12 chapters"));
        assert!(dual.contains("DUAL-FORMAT CITATIONS"));
        assert!(dual.contains("[BEGIN PAGE X (Book Page Y)]"));
        assert!(dual.ends_with("include both Book Pages and PDF Pages in citations."));

        let single = render_instructions_text("Field Guide", 1, 1, false);
        assert!(!single.contains("Book Pages"));
        assert!(single.contains("- Pages are clearly marked: [BEGIN PAGE X] / [END PAGE X].\n\n"));
        assert!(single.ends_with("Use narrow page ranges in citations."));
    }

    #[test]
    fn writers_create_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("combined").join("instructions.txt");
        write_instructions(UNTITLED_BOOK, 2, 4, false, &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("*Untitled Book*"));
    }
}
