use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use indexmap::IndexMap;
use weba_parser::Markup;

use crate::{Config, Error, Result, Template};

/// Where a component's markup comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Markup given inline.
    Html(Cow<'static, str>),
    /// Markup read from a file the first time it is needed.
    File(PathBuf),
}

impl Source {
    /// Inline markup.
    pub fn html(markup: impl Into<Cow<'static, str>>) -> Self {
        Source::Html(markup.into())
    }

    /// Markup stored in the file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    fn describe(&self, component: &str) -> String {
        match self {
            Source::Html(_) => format!("inline markup of {component}"),
            Source::File(path) => path.display().to_string(),
        }
    }

    /// Names the source without reference to a requesting component.
    fn label(&self) -> String {
        match self {
            Source::Html(markup) => format!("inline markup ({} bytes)", markup.len()),
            Source::File(path) => path.display().to_string(),
        }
    }

    fn load(&self) -> Result<Cow<'_, str>> {
        match self {
            Source::Html(markup) => Ok(Cow::Borrowed(markup.as_ref())),
            Source::File(path) => read_file(path).map(Cow::Owned),
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

type CacheKey = (Markup, Source);

/// A bounded least-recently-used cache of parsed component templates.
///
/// Lookups and inserts happen under one lock, so concurrent first-time
/// lookups of the same source parse it at most once.
#[derive(Debug)]
pub struct TemplateCache {
    capacity: usize,
    entries: Mutex<IndexMap<CacheKey, Arc<Template>>>,
}

impl TemplateCache {
    /// A cache holding at most `capacity` templates. Zero keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// A cache sized by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_size)
    }

    /// The process-wide cache, sized from the environment on first use.
    pub fn global() -> Arc<TemplateCache> {
        static GLOBAL: OnceLock<Arc<TemplateCache>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(TemplateCache::from_config(&Config::from_env())))
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<CacheKey, Arc<Template>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The parsed template for `source`, loading and parsing it on a miss.
    ///
    /// `component` names the requester in errors and logs.
    pub fn get_or_parse(
        &self,
        source: &Source,
        markup: Markup,
        component: &str,
    ) -> Result<Arc<Template>> {
        let key = (markup, source.clone());
        let mut entries = self.lock();

        if let Some(template) = entries.shift_remove(&key) {
            tracing::debug!(component, source = %source.describe(component), "template cache hit");
            entries.insert(key, template.clone());
            return Ok(template);
        }

        tracing::debug!(component, source = %source.describe(component), "template cache miss");
        let text = source.load()?;
        let template = Template::parse(&text, markup).map_err(|source_error| Error::Parse {
            source_name: source.describe(component),
            source: source_error,
        })?;
        let template = Arc::new(template);

        if self.capacity > 0 {
            entries.insert(key, template.clone());
            while entries.len() > self.capacity {
                if let Some(((_, evicted), _)) = entries.shift_remove_index(0) {
                    tracing::debug!(source = %evicted.label(), "template cache eviction");
                }
            }
        }
        Ok(template)
    }

    /// Whether `source` is currently cached for `markup`.
    pub fn contains(&self, source: &Source, markup: Markup) -> bool {
        self.lock().contains_key(&(markup, source.clone()))
    }

    /// Drop every cached template.
    pub fn clear(&self) {
        let mut entries = self.lock();
        tracing::debug!(entries = entries.len(), "template cache cleared");
        entries.clear();
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum number of templates kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
