//! In-memory registry of compiled templates

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::environment::Environment;
use super::loader::LoadError;
use super::render::Template;
use super::stringify::{PlainStringifier, Stringifier};
use super::types::{TemplateError, ROOT_BLOCK};
use crate::metrics::{RenderMetrics, StoreMetrics};

/// Store-specific error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template ID: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A compiled template together with its source
#[derive(Debug, Clone)]
pub struct StoredTemplate {
    pub id: String,
    pub description: Option<String>,
    pub source: String,
    pub template: Arc<Template>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a stored template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Block names in registration order
    pub blocks: Vec<String>,
    pub source_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredTemplate> for TemplateInfo {
    fn from(stored: &StoredTemplate) -> Self {
        Self {
            id: stored.id.clone(),
            description: stored.description.clone(),
            blocks: stored
                .template
                .blocks()
                .into_iter()
                .map(str::to_string)
                .collect(),
            source_bytes: stored.source.len(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

/// Request to create a new template
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    /// Unique template identifier
    pub id: String,

    /// Raw template text
    pub source: String,

    /// Template description (optional)
    pub description: Option<String>,
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    /// New raw template text (optional)
    pub source: Option<String>,

    /// Template description (optional, use null to clear)
    pub description: Option<Option<String>>,
}

/// Response for listing templates
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateInfo>,
    pub total: usize,
}

/// Validate a template ID (1-64 alphanumeric, dash, or underscore characters)
pub fn validate_id(id: &str) -> StoreResult<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(StoreError::InvalidId(
            "ID must be 1-64 characters".to_string(),
        ));
    }

    if !id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(StoreError::InvalidId(
            "ID must contain only alphanumeric, dash, or underscore".to_string(),
        ));
    }

    Ok(())
}

/// In-memory template storage
#[derive(Debug)]
pub struct TemplateStore {
    templates: DashMap<String, StoredTemplate>,
    stringifier: Arc<dyn Stringifier>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    /// Create a store whose templates interpolate without escaping
    pub fn new() -> Self {
        Self::with_stringifier(Arc::new(PlainStringifier))
    }

    /// Create a store whose templates interpolate through `stringifier`
    pub fn with_stringifier(stringifier: Arc<dyn Stringifier>) -> Self {
        Self {
            templates: DashMap::new(),
            stringifier,
        }
    }

    fn compile(&self, source: &str) -> StoreResult<Template> {
        match Template::from_string(source) {
            Ok(template) => Ok(template.with_stringifier(self.stringifier.clone())),
            Err(e) => {
                StoreMetrics::record_compile_failure();
                Err(e.into())
            }
        }
    }

    /// Compile and store a new template
    pub fn create(
        &self,
        id: &str,
        source: String,
        description: Option<String>,
    ) -> StoreResult<TemplateInfo> {
        validate_id(id)?;

        let template = self.compile(&source)?;
        let now = Utc::now();
        let stored = StoredTemplate {
            id: id.to_string(),
            description,
            source,
            template: Arc::new(template),
            created_at: now,
            updated_at: now,
        };
        let info = TemplateInfo::from(&stored);

        // The shard lock must be released before `count` walks every shard
        match self.templates.entry(id.to_string()) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(stored);
            }
        }

        StoreMetrics::set_stored(self.count());
        tracing::info!(template_id = %id, blocks = info.blocks.len(), "Template created");

        Ok(info)
    }

    /// Get a compiled template by ID
    pub fn get(&self, id: &str) -> StoreResult<Arc<Template>> {
        self.templates
            .get(id)
            .map(|t| t.template.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Get a stored template (source included) by ID
    pub fn get_stored(&self, id: &str) -> StoreResult<StoredTemplate> {
        self.templates
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn info(&self, id: &str) -> StoreResult<TemplateInfo> {
        self.templates
            .get(id)
            .map(|t| TemplateInfo::from(t.value()))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// List all templates, ordered by ID
    pub fn list(&self) -> Vec<TemplateInfo> {
        let mut templates: Vec<TemplateInfo> = self
            .templates
            .iter()
            .map(|entry| TemplateInfo::from(entry.value()))
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Update an existing template in place.
    ///
    /// A new source is compiled before the entry is locked; a template deleted
    /// in the meantime stays deleted.
    pub fn update(&self, id: &str, updates: UpdateTemplateRequest) -> StoreResult<TemplateInfo> {
        let recompiled = match updates.source {
            Some(source) => {
                let template = self.compile(&source)?;
                Some((source, Arc::new(template)))
            }
            None => None,
        };

        let mut stored = self
            .templates
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some((source, template)) = recompiled {
            stored.source = source;
            stored.template = template;
        }

        if let Some(description) = updates.description {
            stored.description = description;
        }

        stored.updated_at = Utc::now();
        let info = TemplateInfo::from(&*stored);
        drop(stored);

        tracing::info!(template_id = %id, "Template updated");

        Ok(info)
    }

    /// Delete a template by ID
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        self.templates
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        StoreMetrics::set_stored(self.count());
        tracing::info!(template_id = %id, "Template deleted");
        Ok(())
    }

    /// Check if a template exists
    pub fn exists(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Render one block of a stored template
    pub fn render(&self, id: &str, block: &str, environment: &Environment) -> StoreResult<String> {
        let template = self.get(id)?;

        let started = Instant::now();
        let result = template.render(block, environment);
        RenderMetrics::record("render", started, result.is_ok());

        Ok(result?)
    }

    /// Render one block of a stored template once per item.
    ///
    /// With `index_key`, each item receives its zero-based position under that key.
    pub fn render_each(
        &self,
        id: &str,
        block: &str,
        items: Vec<Environment>,
        defaults: &Environment,
        index_key: Option<&str>,
    ) -> StoreResult<String> {
        let template = self.get(id)?;

        let items: Vec<Environment> = match index_key {
            Some(key) => items
                .into_iter()
                .enumerate()
                .map(|(index, mut item)| {
                    Template::inject(key, index, &mut item);
                    item
                })
                .collect(),
            None => items,
        };

        let started = Instant::now();
        let result = template.render_each(block, &items, defaults);
        RenderMetrics::record("render_each", started, result.is_ok());

        Ok(result?)
    }

    /// Compile `text` on the fly and render its root block
    pub fn evaluate(&self, text: &str, environment: &Environment) -> StoreResult<String> {
        let started = Instant::now();
        let result = self
            .compile(text)
            .and_then(|template| Ok(template.render(ROOT_BLOCK, environment)?));
        RenderMetrics::record("evaluate", started, result.is_ok());

        result
    }

    /// Compile every `*.{extension}` file in `dir`, keyed by file stem.
    ///
    /// Existing templates with the same ID are replaced. Returns the number of
    /// templates loaded.
    pub fn load_dir(&self, dir: impl AsRef<Path>, extension: &str) -> StoreResult<usize> {
        let dir = dir.as_ref();
        let io_error = |source: std::io::Error| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_error)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            if let Err(e) = validate_id(&id) {
                tracing::warn!(path = %path.display(), error = %e, "Skipping template file");
                continue;
            }

            let source = fs::read_to_string(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let template = self.compile(&source).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Failed to compile template");
                e
            })?;

            let now = Utc::now();
            self.templates.insert(
                id.clone(),
                StoredTemplate {
                    id,
                    description: None,
                    source,
                    template: Arc::new(template),
                    created_at: now,
                    updated_at: now,
                },
            );
            loaded += 1;
        }

        StoreMetrics::set_stored(self.count());
        tracing::info!(dir = %dir.display(), loaded, "Templates loaded from directory");

        Ok(loaded)
    }
}

/// Create an Arc-wrapped template store
pub fn create_template_store(stringifier: Arc<dyn Stringifier>) -> Arc<TemplateStore> {
    Arc::new(TemplateStore::with_stringifier(stringifier))
}
