pub mod config;
pub mod error;
pub mod page_numbering;
pub mod chapter_bounds;
pub mod page_text;
pub mod chapter_assembler;
pub mod group_partitioner;
pub mod bundle_renderer;
pub mod layout;
pub mod validation;
pub mod pipeline;

use std::path::Path;

use book_model::BookJob;

pub use config::{default_config, BundlerConfig, BUNDLER_DEFAULTS};
pub use error::BundleError;
pub use layout::{OutputLayout, ProjectLayout};
pub use page_text::{InMemoryPages, PageContent, PageTextDir, PageTextSource};
pub use pipeline::{plan_chapters, run_pipeline, PipelineReport, ProgressEvent};

/// High-level entry: read `page-NNN.txt` files from `pages_dir` and write
/// chapters, bundles, index and instructions under `project_root`.
pub fn bundle_book_from_dir(
    job: &BookJob,
    pages_dir: &Path,
    project_root: &Path,
    cfg: &BundlerConfig,
) -> Result<PipelineReport, BundleError> {
    let layout = ProjectLayout::new(project_root);
    let source = PageTextDir::new(pages_dir);
    run_pipeline(job, &source, &layout, cfg, None)
}
