use std::path::Path;

use dashmap::DashMap;

/// Fallback type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Maps attachment file names to MIME types.
#[cfg_attr(test, mockall::automock)]
pub trait MimeResolver: Send + Sync {
    /// Never fails; unknown extensions resolve to [`OCTET_STREAM`].
    fn resolve(&self, file_name: &str) -> String;

    /// Registers or overwrites a mapping for the rest of the process lifetime.
    /// `extension` may be given with or without its leading dot.
    fn add_mapping(&self, extension: &str, mime_type: &str);
}

/// Custom mappings first, then the `mime_guess` table.
#[derive(Debug, Default)]
pub struct ExtensionMimeResolver {
    custom: DashMap<String, String>,
}

impl ExtensionMimeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys are lowercase with exactly one leading dot, e.g. `.ccap`.
    fn normalize(extension: &str) -> String {
        format!(".{}", extension.trim_start_matches('.').to_ascii_lowercase())
    }
}

impl MimeResolver for ExtensionMimeResolver {
    fn resolve(&self, file_name: &str) -> String {
        let Some(extension) = Path::new(file_name).extension().and_then(|ext| ext.to_str()) else {
            return OCTET_STREAM.to_string();
        };

        if let Some(custom) = self.custom.get(&Self::normalize(extension)) {
            return custom.value().clone();
        }

        mime_guess::from_ext(extension)
            .first()
            .map_or_else(|| OCTET_STREAM.to_string(), |mime| mime.to_string())
    }

    fn add_mapping(&self, extension: &str, mime_type: &str) {
        self.custom
            .insert(Self::normalize(extension), mime_type.to_string());
    }
}
