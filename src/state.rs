//! Application state: configuration, the question store and the pipeline that
//! writes to it. Shared by the CLI commands and the HTTP handlers.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_config_from_env, GeneratorConfig};
use crate::error::StoreError;
use crate::pipeline::Pipeline;
use crate::store::{JsonlStore, MemoryStore, QuestionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: GeneratorConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Build state from env: load config (QGEN_CONFIG_PATH + overrides), open the store.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_config(load_config_from_env())
    }

    pub fn from_config(config: GeneratorConfig) -> Result<Self, StoreError> {
        let store = open_store(&config)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: GeneratorConfig, store: Arc<dyn QuestionStore>) -> Self {
        let pipeline = Arc::new(Pipeline::new(&config, store));
        let p = &config.pipeline;
        info!(
            target: "qgen",
            max_attempts = p.max_attempts,
            option_count = p.option_count,
            workers = p.workers,
            seeded = p.seed.is_some(),
            "Pipeline ready"
        );
        Self { config, pipeline }
    }

    pub fn store(&self) -> &Arc<dyn QuestionStore> {
        self.pipeline.store()
    }
}

/// JSON-lines file when a storage path is configured, memory otherwise.
pub fn open_store(config: &GeneratorConfig) -> Result<Arc<dyn QuestionStore>, StoreError> {
    match &config.storage.path {
        Some(path) => Ok(Arc::new(JsonlStore::open(path)?)),
        None => {
            info!(target: "store", "No storage path configured; questions are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
