//! Per-call generation options

use fillo_foundation::PageContext;
use serde::{Deserialize, Serialize};

/// Options for [`ContentGenerator::generate_for_field`](crate::ContentGenerator::generate_for_field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// Read and write the cache (default `true`)
    pub use_cache: bool,

    /// Skip the cache read but still write the fresh result
    pub force_regenerate: bool,

    /// Pick randomly among several cached candidates
    pub return_multiple: bool,

    pub context: Option<String>,

    pub page_context: Option<PageContext>,

    /// Values to steer away from; history is used when empty
    pub previous_generations: Vec<String>,

    /// Overrides the configured creativity
    pub creativity_level: Option<f64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_regenerate: false,
            return_multiple: false,
            context: None,
            page_context: None,
            previous_generations: Vec::new(),
            creativity_level: None,
        }
    }
}

impl GenerateOptions {
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn force_regenerate(mut self) -> Self {
        self.force_regenerate = true;
        self
    }

    pub fn return_multiple(mut self) -> Self {
        self.return_multiple = true;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_page_context(mut self, page_context: PageContext) -> Self {
        self.page_context = Some(page_context);
        self
    }

    pub fn with_previous(mut self, previous: Vec<String>) -> Self {
        self.previous_generations = previous;
        self
    }

    pub fn with_creativity(mut self, level: f64) -> Self {
        self.creativity_level = Some(level);
        self
    }
}

/// Options for [`ContentGenerator::generate_multiple`](crate::ContentGenerator::generate_multiple)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultipleOptions {
    pub context: Option<String>,
    pub page_context: Option<PageContext>,

    /// Raise creativity by 0.2 per variant (default `true`)
    pub vary_creativity: bool,
}

impl Default for MultipleOptions {
    fn default() -> Self {
        Self {
            context: None,
            page_context: None,
            vary_creativity: true,
        }
    }
}
