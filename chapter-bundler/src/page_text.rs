//! Page-text lookup supplied by the extraction/OCR step.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::config::BUNDLER_DEFAULTS;

/// What a source knows about one physical page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// Already-decoded text.
    Text(String),
    /// Raw bytes, decoded by the assembler (UTF-8 first, then the fallback).
    Bytes(Vec<u8>),
    Missing,
    /// The page exists but could not be read; carries the reason.
    Unreadable(String),
}

/// Read-only lookup from physical page number to page text.
/// Shared across assembly workers, hence `Sync`.
pub trait PageTextSource: Sync {
    fn fetch(&self, physical_page: u32) -> PageContent;
}

/// In-memory pages, mostly for callers that already hold the text.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPages {
    pages: BTreeMap<u32, PageContent>,
}

impl InMemoryPages {
    pub fn new() -> Self { Self::default() }

    pub fn insert_text(&mut self, page: u32, text: impl Into<String>) {
        self.pages.insert(page, PageContent::Text(text.into()));
    }

    pub fn insert_bytes(&mut self, page: u32, bytes: impl Into<Vec<u8>>) {
        self.pages.insert(page, PageContent::Bytes(bytes.into()));
    }

    pub fn len(&self) -> usize { self.pages.len() }

    pub fn is_empty(&self) -> bool { self.pages.is_empty() }
}

impl<S: Into<String>> FromIterator<(u32, S)> for InMemoryPages {
    fn from_iter<T: IntoIterator<Item = (u32, S)>>(iter: T) -> Self {
        let mut pages = InMemoryPages::new();
        for (page, text) in iter { pages.insert_text(page, text); }
        pages
    }
}

impl PageTextSource for InMemoryPages {
    fn fetch(&self, physical_page: u32) -> PageContent {
        self.pages.get(&physical_page).cloned().unwrap_or(PageContent::Missing)
    }
}

/// Directory of per-page text files such as `page-007.txt`.
#[derive(Debug, Clone)]
pub struct PageTextDir {
    dir: PathBuf,
    prefix: String,
    width: usize,
    extension: String,
}

impl PageTextDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: BUNDLER_DEFAULTS.page_file_prefix.into(),
            width: BUNDLER_DEFAULTS.page_number_width,
            extension: BUNDLER_DEFAULTS.text_extension.into(),
        }
    }

    /// Override the file naming (`<prefix><zero-padded page>.<extension>`).
    pub fn with_naming(mut self, prefix: impl Into<String>, width: usize, extension: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.width = width;
        self.extension = extension.into();
        self
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn file_name(&self, physical_page: u32) -> String {
        format!("{}{:0width$}.{}", self.prefix, physical_page, self.extension, width = self.width)
    }

    pub fn path_for(&self, physical_page: u32) -> PathBuf { self.dir.join(self.file_name(physical_page)) }

    /// How many of `pages` have a file in the directory.
    pub fn present_pages(&self, pages: RangeInclusive<u32>) -> usize {
        pages.filter(|&p| self.path_for(p).is_file()).count()
    }
}

impl PageTextSource for PageTextDir {
    fn fetch(&self, physical_page: u32) -> PageContent {
        match fs::read(self.path_for(physical_page)) {
            Ok(bytes) => PageContent::Bytes(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => PageContent::Missing,
            Err(e) => PageContent::Unreadable(e.to_string()),
        }
    }
}

/// Result of decoding stored text bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Utf8(String),
    Fallback(String),
    Undecodable,
}

/// Decode as UTF-8 (BOM stripped), else strictly under `fallback`.
/// Line endings are normalized to `\n`.
pub fn decode_text_bytes(bytes: &[u8], fallback: &'static Encoding) -> Decoded {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded::Utf8(normalize_newlines(text));
    }
    match fallback.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(cow) => Decoded::Fallback(normalize_newlines(&cow)),
        None => Decoded::Undecodable,
    }
}

pub(crate) fn normalize_newlines(text: &str) -> String {
    if text.contains('\r') { text.replace("\r\n", "\n").replace('\r', "\n") } else { text.to_string() }
}
