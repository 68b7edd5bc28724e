//! book-bundler - split page-level text into balanced chapter bundles
//!
//! Usage:
//!   book-bundler plan --total-pages 30 --starts 1,10,25      Show derived chapters
//!   book-bundler run --out DIR --job job.json                Write chapters, bundles, index

use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use book_model::{BookJob, Chapter, ChapterKind};
use chapter_bundler::validation::parse_page_list;
use chapter_bundler::{
    plan_chapters, run_pipeline, BundlerConfig, OutputLayout, PageTextDir, PipelineReport, ProgressEvent, ProjectLayout,
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "book-bundler")]
#[command(about = "Assemble chapter files and balanced bundles from per-page text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level (RUST_LOG still applies)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Derive chapters and write every artifact
    Run(RunArgs),
    /// Print the derived chapters without writing anything
    Plan(PlanArgs),
}

/// Job inputs: either a JSON job file or flags.
#[derive(Args, Clone, Debug)]
struct JobArgs {
    /// JSON job file (BookJob); flags below override its fields
    #[arg(long)]
    job: Option<PathBuf>,

    #[arg(long)]
    total_pages: Option<u32>,

    /// Comma-separated chapter start pages, e.g. 1,10,25
    #[arg(long)]
    starts: Option<String>,

    /// Chapter title, repeat once per chapter in order
    #[arg(long = "chapter-title", value_name = "TITLE")]
    chapter_titles: Vec<String>,

    /// Chapter description, repeat once per chapter in order
    #[arg(long = "chapter-description", value_name = "TEXT")]
    chapter_descriptions: Vec<String>,

    /// Unnumbered pages before printed page 1
    #[arg(long)]
    offset: Option<u32>,

    /// Start pages (and --last-end) are printed book pages
    #[arg(long)]
    printed_starts: bool,

    /// Last page of the final chapter
    #[arg(long)]
    last_end: Option<u32>,

    /// Book title used in the index and instructions
    #[arg(long)]
    title: Option<String>,
}

#[derive(Args, Clone, Debug)]
struct RunArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Output directory (project root, or parent with --fresh-project)
    #[arg(long)]
    out: PathBuf,

    /// Directory of page-NNN.txt files (default: <project>/text)
    #[arg(long)]
    pages_dir: Option<PathBuf>,

    /// Create a new project directory NAME under --out, suffixed if taken
    #[arg(long, value_name = "NAME")]
    fresh_project: Option<String>,

    /// JSON BundlerConfig; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_bundles: Option<NonZeroUsize>,

    /// Fallback encoding label for pages that are not UTF-8
    #[arg(long)]
    encoding: Option<String>,

    /// Worker threads for chapter assembly
    #[arg(long)]
    threads: Option<usize>,

    /// Skip manifest.json
    #[arg(long)]
    no_manifest: bool,
}

#[derive(Args, Clone, Debug)]
struct PlanArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Also write the resolved job as JSON
    #[arg(long, value_name = "FILE")]
    save_job: Option<PathBuf>,
}

fn build_job(args: &JobArgs) -> Result<BookJob, String> {
    let mut job = match &args.job {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|e| format!("read job {}: {}", path.display(), e))?;
            BookJob::from_json_str(&raw).map_err(|e| format!("parse job {}: {}", path.display(), e))?
        }
        None => BookJob::default(),
    };
    if let Some(n) = args.total_pages { job.total_pages = n; }
    if let Some(s) = &args.starts { job.chapter_starts = parse_page_list(s).map_err(|e| e.to_string())?; }
    if !args.chapter_titles.is_empty() { job.chapter_titles = args.chapter_titles.clone(); }
    if !args.chapter_descriptions.is_empty() { job.chapter_descriptions = args.chapter_descriptions.clone(); }
    if let Some(o) = args.offset { job.page_offset = o; }
    if args.printed_starts { job.starts_are_printed = true; }
    if let Some(e) = args.last_end { job.last_chapter_end = Some(e); }
    if let Some(t) = &args.title { job.title = Some(t.clone()); }
    if job.total_pages == 0 { return Err("--total-pages (or a job file) is required".into()); }
    if job.chapter_starts.is_empty() { return Err("--starts (or a job file) is required".into()); }
    Ok(job)
}

fn build_config(args: &RunArgs) -> Result<BundlerConfig, String> {
    let mut cfg = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|e| format!("read config {}: {}", path.display(), e))?;
            BundlerConfig::from_json_str(&raw).map_err(|e| format!("parse config {}: {}", path.display(), e))?
        }
        None => BundlerConfig::default(),
    };
    if let Some(k) = args.max_bundles { cfg.max_bundles = k; }
    if let Some(enc) = &args.encoding { cfg.fallback_encoding = enc.clone(); }
    if let Some(n) = args.threads { cfg.worker_threads = Some(n); }
    if args.no_manifest { cfg.write_manifest = false; }
    Ok(cfg)
}

fn kind_label(kind: ChapterKind) -> &'static str {
    match kind {
        ChapterKind::FrontMatter => "front",
        ChapterKind::Body => "body",
        ChapterKind::BackMatter => "back",
    }
}

fn print_chapters(chapters: &[Chapter], dual: bool) {
    for ch in chapters {
        let pages = if dual {
            format!("PDF {}-{}  Book {}-{}", ch.physical_start, ch.physical_end, ch.printed_start, ch.printed_end)
        } else {
            format!("{}-{}", ch.physical_start, ch.physical_end)
        };
        println!(
            "{:>3}  {:<5}  {:<24}  {:>4}p  {}  {}",
            ch.number,
            kind_label(ch.kind),
            pages,
            ch.page_count(),
            ch.title,
            ch.description.as_deref().unwrap_or("")
        );
    }
}

fn do_plan(args: PlanArgs) -> Result<(), String> {
    let job = build_job(&args.job)?;
    let chapters = plan_chapters(&job).map_err(|e| e.to_string())?;
    println!("{} chapter(s) over {} page(s), offset {}", chapters.len(), job.total_pages, job.page_offset);
    print_chapters(&chapters, job.offset().is_dual());
    if let Some(path) = args.save_job {
        let json = job.to_json_pretty().map_err(|e| e.to_string())?;
        fs::write(&path, json).map_err(|e| format!("write job {}: {}", path.display(), e))?;
        println!("job saved: {}", path.display());
    }
    Ok(())
}

fn print_report(report: &PipelineReport, layout: &ProjectLayout) {
    println!("chapters: {} assembled -> {}", report.chapters.len(), layout.chapters_dir().display());
    println!("bundles:  {} written -> {}", report.bundle_paths.len(), layout.bundles_dir().display());
    for g in &report.groups {
        let weight: usize = report.chapters.iter().filter(|c| g.contains(c.number)).map(|c| c.char_count).sum();
        println!("  combined_{}.txt  {:<16}  {} chars", g.label, g.description, weight);
    }
    if let Some(p) = &report.index_path { println!("index:        {}", p.display()); }
    if let Some(p) = &report.instructions_path { println!("instructions: {}", p.display()); }
    if let Some(p) = &report.manifest_path { println!("manifest:     {}", p.display()); }
    let pages = &report.pages;
    if pages.placeholders() > 0 || pages.fallback_decoded > 0 {
        println!(
            "pages: {} missing, {} undecodable, {} unreadable, {} decoded with fallback encoding",
            pages.missing, pages.undecodable, pages.unreadable, pages.fallback_decoded
        );
    }
    for f in &report.failures {
        println!("failed: {}: {}", f.artifact, f.error);
    }
}

/// Page files for the run; a directory with none of the job's pages is refused.
fn page_source(pages_dir: PathBuf, total_pages: u32) -> Result<PageTextDir, String> {
    if !pages_dir.is_dir() {
        return Err(format!("pages directory not found: {}", pages_dir.display()));
    }
    let source = PageTextDir::new(pages_dir);
    if source.present_pages(1..=total_pages) == 0 {
        return Err(format!(
            "no page files ({} .. {}) in {}",
            source.file_name(1),
            source.file_name(total_pages),
            source.dir().display()
        ));
    }
    Ok(source)
}

fn do_run(args: RunArgs) -> Result<(), String> {
    let job = build_job(&args.job)?;
    let cfg = build_config(&args)?;
    if args.fresh_project.is_some() && args.pages_dir.is_none() {
        return Err("--fresh-project needs --pages-dir (a new project has no page text)".into());
    }
    let layout = match &args.fresh_project {
        Some(name) => ProjectLayout::create_unique(&args.out, name).map_err(|e| e.to_string())?,
        None => {
            let layout = ProjectLayout::new(&args.out);
            layout.ensure_dirs().map_err(|e| e.to_string())?;
            layout
        }
    };
    let pages_dir = args.pages_dir.clone().unwrap_or_else(|| layout.pages_dir());
    let source = page_source(pages_dir, job.total_pages)?;

    let progress: Box<dyn FnMut(ProgressEvent) + Send> = Box::new(|event| match event {
        ProgressEvent::ChapterAssembled { number, done, total } => eprintln!("[{done}/{total}] chapter {number}"),
        ProgressEvent::BundleWritten { label, done, total } => eprintln!("[{done}/{total}] combined_{label}.txt"),
        _ => {}
    });
    let report = run_pipeline(&job, &source, &layout, &cfg, Some(progress)).map_err(|e| e.to_string())?;
    print_report(&report, &layout);
    if report.failure_count() > 0 {
        return Err(format!("{} artifact(s) could not be written", report.failure_count()));
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let res = match cli.command {
        Command::Run(args) => do_run(args),
        Command::Plan(args) => do_plan(args),
    };
    if let Err(err) = res {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
