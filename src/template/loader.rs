//! Loading template text from disk

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::render::Template;
use super::types::TemplateError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl Template {
    /// Read and compile the template at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let template = Template::from_string(&text)?;
        tracing::debug!(path = %path.display(), blocks = template.blocks().len(), "Template loaded");
        Ok(template)
    }
}
