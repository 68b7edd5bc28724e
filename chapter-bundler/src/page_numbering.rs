//! Physical (document order) vs printed (book) page numbers.
//!
//! A document with `offset` unnumbered leading pages shows printed page 1 on
//! physical page `offset + 1`. Pages inside the offset region map to printed
//! numbers <= 0; callers must not assume positivity.

use book_model::{Chapter, PageOffset};

/// Printed page number for a physical page.
pub fn to_printed(physical_page: i64, offset: i64) -> i64 {
    if offset <= 0 { physical_page } else { physical_page - offset }
}

pub fn printed_page(physical_page: u32, offset: PageOffset) -> i64 {
    to_printed(i64::from(physical_page), i64::from(offset.get()))
}

/// Inverse of [`printed_page`].
pub fn physical_page(printed_page: i64, offset: PageOffset) -> i64 {
    offset.physical_of(printed_page)
}

/// Body of a page marker: `PAGE 25 (Book Page 15)` or `PAGE 25`.
pub fn page_marker(physical: u32, offset: PageOffset) -> String {
    if offset.is_dual() {
        format!("PAGE {} (Book Page {})", physical, printed_page(physical, offset))
    } else {
        format!("PAGE {physical}")
    }
}

/// Inclusive page span in both numbering systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub physical_start: u32,
    pub physical_end: u32,
    pub printed_start: i64,
    pub printed_end: i64,
    /// Whether printed numbers should be shown next to physical ones.
    pub dual: bool,
}

impl PageSpan {
    pub fn of_chapter(ch: &Chapter) -> Self {
        Self {
            physical_start: ch.physical_start,
            physical_end: ch.physical_end,
            printed_start: ch.printed_start,
            printed_end: ch.printed_end,
            dual: ch.uses_dual_numbering(),
        }
    }

    /// Smallest span covering all given chapters; dual if any member is.
    pub fn covering<'a, I>(chapters: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Chapter>,
    {
        chapters.into_iter().map(Self::of_chapter).reduce(|a, b| Self {
            physical_start: a.physical_start.min(b.physical_start),
            physical_end: a.physical_end.max(b.physical_end),
            printed_start: a.printed_start.min(b.printed_start),
            printed_end: a.printed_end.max(b.printed_end),
            dual: a.dual || b.dual,
        })
    }

    /// `Book Pages 1-10 (PDF Pages 5-14)` / `Pages 5-14`
    pub fn heading_label(&self) -> String {
        if self.dual {
            format!(
                "Book Pages {}-{} (PDF Pages {}-{})",
                self.printed_start, self.printed_end, self.physical_start, self.physical_end
            )
        } else {
            format!("Pages {}-{}", self.physical_start, self.physical_end)
        }
    }

    /// `Book Pages 1-10, PDF Pages 5-14` / `Pages 5-14`
    pub fn bundle_label(&self) -> String {
        if self.dual {
            format!(
                "Book Pages {}-{}, PDF Pages {}-{}",
                self.printed_start, self.printed_end, self.physical_start, self.physical_end
            )
        } else {
            format!("Pages {}-{}", self.physical_start, self.physical_end)
        }
    }

    /// `Book p.1-10, PDF p.5-14` / `p.5-14`
    pub fn index_label(&self) -> String {
        if self.dual {
            format!(
                "Book p.{}-{}, PDF p.{}-{}",
                self.printed_start, self.printed_end, self.physical_start, self.physical_end
            )
        } else {
            format!("p.{}-{}", self.physical_start, self.physical_end)
        }
    }
}
