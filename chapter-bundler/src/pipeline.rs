//! End-to-end run: validate, derive, assemble, partition, render.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use book_model::{ArtifactKind, BookJob, BundleManifest, Chapter, ChapterGroup, ManifestEntry, SCHEMA_MAJOR};
use sha2::Digest;
use tracing::{info, warn};

use crate::bundle_renderer::{write_artifact, write_bundle, write_index, write_instructions, UNTITLED_BOOK};
use crate::chapter_assembler::{assemble_chapters, PageStats};
use crate::chapter_bounds::{apply_descriptions, derive_chapters_with_end};
use crate::config::BundlerConfig;
use crate::error::BundleError;
use crate::group_partitioner::group_chapters;
use crate::layout::OutputLayout;
use crate::page_text::PageTextSource;
use crate::validation::validate_job;

/// Progress events emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Start { chapters: usize },
    ChapterAssembled { number: u32, done: usize, total: usize },
    Partitioned { bundles: usize },
    BundleWritten { label: String, done: usize, total: usize },
    IndexWritten,
    InstructionsWritten,
    Finished { bundles: usize, failures: usize },
}

/// Artifact a failure refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    Chapter(u32),
    Bundle(String),
    Index,
    Instructions,
    Manifest,
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactRef::Chapter(n) => write!(f, "chapter {n}"),
            ArtifactRef::Bundle(label) => write!(f, "bundle {label}"),
            ArtifactRef::Index => f.write_str("index"),
            ArtifactRef::Instructions => f.write_str("instructions"),
            ArtifactRef::Manifest => f.write_str("manifest"),
        }
    }
}

#[derive(Debug)]
pub struct ArtifactFailure {
    pub artifact: ArtifactRef,
    pub error: BundleError,
}

/// What a run produced. Failures never hide what did succeed.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Chapters that were assembled, with weights and content paths.
    pub chapters: Vec<Chapter>,
    pub groups: Vec<ChapterGroup>,
    pub bundle_paths: Vec<PathBuf>,
    pub index_path: Option<PathBuf>,
    pub instructions_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    /// Page resolution summed over all assembled chapters.
    pub pages: PageStats,
    /// Bundle members replaced by a placeholder.
    pub bundle_placeholders: usize,
    pub failures: Vec<ArtifactFailure>,
}

impl PipelineReport {
    pub fn failure_count(&self) -> usize { self.failures.len() }

    pub fn is_clean(&self) -> bool { self.failures.is_empty() && self.pages.placeholders() == 0 && self.bundle_placeholders == 0 }
}

/// Validate a job and derive its chapters without touching the disk.
pub fn plan_chapters(job: &BookJob) -> Result<Vec<Chapter>, BundleError> {
    validate_job(job)?;
    let mut chapters = derive_chapters_with_end(
        &job.physical_starts(),
        &job.chapter_titles,
        job.total_pages,
        job.physical_last_end(),
        job.offset(),
    );
    apply_descriptions(&mut chapters, &job.chapter_descriptions);
    Ok(chapters)
}

/// Run a whole job. Only invalid input is returned as `Err`; per-artifact
/// I/O failures are collected in the report.
pub fn run_pipeline(
    job: &BookJob,
    source: &dyn PageTextSource,
    layout: &dyn OutputLayout,
    cfg: &BundlerConfig,
    mut progress: Option<Box<dyn FnMut(ProgressEvent) + Send>>,
) -> Result<PipelineReport, BundleError> {
    let fallback = cfg.fallback_encoding()?;
    let planned = plan_chapters(job)?;
    let mut report = PipelineReport::default();
    let total = planned.len();
    if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Start { chapters: total }); }

    let results = assemble_chapters(&planned, source, |c| layout.chapter_path(c.number), fallback, cfg.worker_threads);
    for (done, (mut chapter, result)) in planned.into_iter().zip(results).enumerate() {
        match result {
            Ok(assembled) => {
                add_stats(&mut report.pages, &assembled.pages);
                chapter.char_count = assembled.char_count;
                chapter.content_path = Some(assembled.path);
                if let Some(cb) = progress.as_deref_mut() {
                    cb(ProgressEvent::ChapterAssembled { number: chapter.number, done: done + 1, total });
                }
                report.chapters.push(chapter);
            }
            Err(error) => {
                warn!(chapter = chapter.number, %error, "chapter assembly failed");
                report.failures.push(ArtifactFailure { artifact: ArtifactRef::Chapter(chapter.number), error });
            }
        }
    }
    info!(
        assembled = report.chapters.len(),
        failed = report.failures.len(),
        missing_pages = report.pages.missing,
        "chapters assembled"
    );

    report.groups = group_chapters(&report.chapters, cfg.max_bundles);
    let bundle_total = report.groups.len();
    if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Partitioned { bundles: bundle_total }); }
    info!(bundles = bundle_total, max_bundles = cfg.max_bundles.get(), "chapters partitioned");

    if report.groups.is_empty() {
        warn!("no chapters available; nothing to bundle");
        if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Finished { bundles: 0, failures: report.failure_count() }); }
        return Ok(report);
    }

    for (done, group) in report.groups.iter().enumerate() {
        let path = layout.bundle_path(&group.label);
        match write_bundle(group, &report.chapters, &path, fallback) {
            Ok(rendered) => {
                report.bundle_placeholders += rendered.placeholders;
                report.bundle_paths.push(rendered.path);
                if let Some(cb) = progress.as_deref_mut() {
                    cb(ProgressEvent::BundleWritten { label: group.label.clone(), done: done + 1, total: bundle_total });
                }
            }
            Err(error) => {
                warn!(bundle = %group.label, %error, "bundle write failed");
                report.failures.push(ArtifactFailure { artifact: ArtifactRef::Bundle(group.label.clone()), error });
            }
        }
    }

    let index_path = layout.index_path();
    let today = chrono::Local::now().date_naive();
    match write_index(&report.groups, &report.chapters, job.title.as_deref(), today, &index_path) {
        Ok(()) => {
            report.index_path = Some(index_path);
            if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::IndexWritten); }
        }
        Err(error) => report.failures.push(ArtifactFailure { artifact: ArtifactRef::Index, error }),
    }

    let instructions_path = layout.instructions_path();
    let title = job.title.as_deref().map(str::trim).filter(|t| !t.is_empty()).unwrap_or(UNTITLED_BOOK);
    let dual = job.offset().is_dual();
    match write_instructions(title, bundle_total, report.chapters.len(), dual, &instructions_path) {
        Ok(()) => {
            report.instructions_path = Some(instructions_path);
            if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::InstructionsWritten); }
        }
        Err(error) => report.failures.push(ArtifactFailure { artifact: ArtifactRef::Instructions, error }),
    }

    if cfg.write_manifest {
        let manifest_path = layout.manifest_path();
        match write_manifest(job, &report, dual, &manifest_path) {
            Ok(()) => report.manifest_path = Some(manifest_path),
            Err(error) => report.failures.push(ArtifactFailure { artifact: ArtifactRef::Manifest, error }),
        }
    }

    for failure in &report.failures {
        warn!(artifact = %failure.artifact, error = %failure.error, "artifact not produced");
    }
    info!(
        bundles = report.bundle_paths.len(),
        failures = report.failure_count(),
        placeholders = report.pages.placeholders() + report.bundle_placeholders,
        "bundling finished"
    );
    if let Some(cb) = progress.as_deref_mut() {
        cb(ProgressEvent::Finished { bundles: report.bundle_paths.len(), failures: report.failure_count() });
    }
    Ok(report)
}

fn add_stats(total: &mut PageStats, add: &PageStats) {
    total.written += add.written;
    total.missing += add.missing;
    total.undecodable += add.undecodable;
    total.unreadable += add.unreadable;
    total.fallback_decoded += add.fallback_decoded;
}

/// Size and SHA-256 (hex) of a file, read in chunks.
pub fn file_digest(path: &Path) -> Result<(u64, String), BundleError> {
    let f = File::open(path).map_err(|e| BundleError::io("open artifact for hashing", path, e))?;
    let mut reader = BufReader::new(f);
    let mut hasher = sha2::Sha256::new();
    let mut buf = [0u8; 32 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf).map_err(|e| BundleError::io("hash artifact", path, e))?;
        if n == 0 { break; }
        size += n as u64;
        hasher.update(&buf[..n]);
    }
    Ok((size, hex::encode(hasher.finalize())))
}

fn manifest_entry(kind: ArtifactKind, path: &Path) -> Result<ManifestEntry, BundleError> {
    let (size_bytes, sha256) = file_digest(path)?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(ManifestEntry { kind, file_name, size_bytes, sha256 })
}

fn write_manifest(job: &BookJob, report: &PipelineReport, dual: bool, path: &Path) -> Result<(), BundleError> {
    let mut entries = Vec::new();
    for ch in &report.chapters {
        if let Some(p) = ch.content_path.as_deref() {
            entries.push(manifest_entry(ArtifactKind::Chapter, p)?);
        }
    }
    for p in &report.bundle_paths {
        entries.push(manifest_entry(ArtifactKind::Bundle, p)?);
    }
    if let Some(p) = report.index_path.as_deref() {
        entries.push(manifest_entry(ArtifactKind::Index, p)?);
    }
    if let Some(p) = report.instructions_path.as_deref() {
        entries.push(manifest_entry(ArtifactKind::Instructions, p)?);
    }
    let manifest = BundleManifest {
        schema_version: SCHEMA_MAJOR,
        book_title: job.title.clone(),
        chapter_count: report.chapters.len(),
        bundle_count: report.bundle_paths.len(),
        dual_numbering: dual,
        generated_at: chrono::Utc::now().to_rfc3339(),
        entries,
    };
    let json = manifest.to_json_pretty()?;
    write_artifact(path, &json, "write manifest")
}
