use std::num::NonZeroUsize;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::BundleError;

/// Fixed naming and sizing defaults for a bundling run.
#[derive(Debug, Clone, Copy)]
pub struct BundlerDefaults {
    pub max_bundles: usize,
    pub page_file_prefix: &'static str,
    pub page_number_width: usize,
    pub text_extension: &'static str,
    pub chapter_file_prefix: &'static str,
    pub bundle_file_prefix: &'static str,
    pub index_file_name: &'static str,
    pub instructions_file_name: &'static str,
    pub manifest_file_name: &'static str,
    pub pages_dir_name: &'static str,
    pub chapters_dir_name: &'static str,
    pub bundles_dir_name: &'static str,
    pub fallback_encoding: &'static str,
}

/// Shared defaults so the CLI, the library and tests stay in sync.
pub const BUNDLER_DEFAULTS: BundlerDefaults = BundlerDefaults {
    max_bundles: 9,
    page_file_prefix: "page-",
    page_number_width: 3,
    text_extension: "txt",
    chapter_file_prefix: "chapter_",
    bundle_file_prefix: "combined_",
    index_file_name: "index.txt",
    instructions_file_name: "instructions.txt",
    manifest_file_name: "manifest.json",
    pages_dir_name: "text",
    chapters_dir_name: "chapters",
    bundles_dir_name: "combined",
    fallback_encoding: "windows-1252",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Upper bound on the number of bundle files.
    pub max_bundles: NonZeroUsize,
    /// Encoding label tried when page bytes are not valid UTF-8.
    pub fallback_encoding: String,
    /// Worker threads for chapter assembly; `None` uses all cores.
    pub worker_threads: Option<usize>,
    /// Write `manifest.json` next to the bundles.
    pub write_manifest: bool,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            max_bundles: NonZeroUsize::new(BUNDLER_DEFAULTS.max_bundles).unwrap_or(NonZeroUsize::MIN),
            fallback_encoding: BUNDLER_DEFAULTS.fallback_encoding.into(),
            worker_threads: None,
            write_manifest: true,
        }
    }
}

impl BundlerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, BundleError> { Ok(serde_json::from_str(s)?) }

    /// Resolve `fallback_encoding` through the WHATWG label table.
    pub fn fallback_encoding(&self) -> Result<&'static Encoding, BundleError> {
        Encoding::for_label(self.fallback_encoding.trim().as_bytes())
            .ok_or_else(|| BundleError::invalid(format!("unknown fallback encoding: {}", self.fallback_encoding)))
    }
}

/// Convenience helper mirroring [`BUNDLER_DEFAULTS`].
pub fn default_config() -> BundlerConfig { BundlerConfig::default() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let cfg = default_config();
        assert_eq!(cfg.max_bundles.get(), 9);
        assert_eq!(cfg.fallback_encoding().unwrap(), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn latin1_label_maps_to_windows_1252() {
        let cfg = BundlerConfig { fallback_encoding: "latin1".into(), ..Default::default() };
        assert_eq!(cfg.fallback_encoding().unwrap(), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let cfg = BundlerConfig { fallback_encoding: "klingon".into(), ..Default::default() };
        assert!(matches!(cfg.fallback_encoding(), Err(BundleError::InvalidInput(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = BundlerConfig::from_json_str(r#"{ "max_bundles": 4 }"#).unwrap();
        assert_eq!(cfg.max_bundles.get(), 4);
        assert!(cfg.write_manifest);
        assert_eq!(cfg.fallback_encoding, "windows-1252");
    }

    #[test]
    fn zero_bundles_is_not_representable() {
        assert!(BundlerConfig::from_json_str(r#"{ "max_bundles": 0 }"#).is_err());
    }
}
