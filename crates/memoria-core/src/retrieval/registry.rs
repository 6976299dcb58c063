//! Retriever Registry (§4.6): a process-wide, named catalog of strategy factories.
//!
//! Registration is static, performed once at composition-root startup by
//! [`register_default_strategies`]; [`RetrieverRegistry::get`] instantiates a retriever by name
//! plus per-request string parameters (e.g. `alpha`, `k_rrf`, `text_weight`).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::index_manager::IndexManager;

use super::strategies::{self, Retriever};

/// Per-request strategy parameters, e.g. `{"alpha": "0.7"}` or `{"k_rrf": "30"}`. Unset keys
/// fall back to the strategy's documented default (§4.7).
pub type StrategyParams = BTreeMap<String, String>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("unknown retrieval strategy: {0}")]
    UnknownStrategy(String),
    #[error("invalid value for parameter {key}: {value:?}")]
    InvalidParam { key: String, value: String },
}

pub(super) fn parse_f32(params: &StrategyParams, key: &str, default: f32) -> Result<f32, RegistryError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => {
            v.parse::<f32>().map_err(|_| RegistryError::InvalidParam { key: key.to_string(), value: v.clone() })
        }
    }
}

/// `{name, description}`, the shape returned by [`RetrieverRegistry::list`].
#[derive(Debug, Clone)]
pub struct StrategyDescription {
    pub name: String,
    pub description: String,
}

type Factory = Box<dyn Fn(Arc<IndexManager>, &StrategyParams) -> Result<Box<dyn Retriever>, RegistryError> + Send + Sync>;

/// A name -> strategy-factory catalog. Registering a name that already exists overwrites the
/// previous factory and logs a warning (§4.6 "duplicate registration overwrites with a warning").
#[derive(Default)]
pub struct RetrieverRegistry {
    factories: RwLock<HashMap<String, (String, Factory)>>,
}

impl RetrieverRegistry {
    pub fn new() -> Self {
        Self { factories: RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, name: impl Into<String>, description: impl Into<String>, factory: Factory) {
        let name = name.into();
        let mut factories = self.factories.write().expect("registry lock poisoned");
        if factories.contains_key(&name) {
            tracing::warn!(strategy = %name, "overwriting existing retrieval strategy registration");
        }
        factories.insert(name, (description.into(), factory));
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.read().expect("registry lock poisoned").contains_key(name)
    }

    pub fn list(&self) -> Vec<StrategyDescription> {
        self.factories
            .read()
            .expect("registry lock poisoned")
            .iter()
            .map(|(name, (description, _))| StrategyDescription { name: name.clone(), description: description.clone() })
            .collect()
    }

    pub fn get(
        &self,
        name: &str,
        index: Arc<IndexManager>,
        params: &StrategyParams,
    ) -> Result<Box<dyn Retriever>, RegistryError> {
        let factories = self.factories.read().expect("registry lock poisoned");
        let (_, factory) =
            factories.get(name).ok_or_else(|| RegistryError::UnknownStrategy(name.to_string()))?;
        factory(index, params)
    }
}

/// Registers all ten catalog strategies (§4.7) under their spec names. Mirrors the upstream
/// service's import-for-registration-side-effect pattern, expressed as one explicit call since
/// Rust has no module-import side-effect convention to imitate faithfully (§4.7 supplement).
pub fn register_default_strategies(registry: &RetrieverRegistry) {
    registry.register("text", "Dense kNN search over the text store.", Box::new(|index, _params| {
        Ok(Box::new(strategies::TextRetriever::new(index)) as Box<dyn Retriever>)
    }));

    registry.register("image", "Dense kNN search over the image store.", Box::new(|index, _params| {
        Ok(Box::new(strategies::ImageRetriever::new(index)) as Box<dyn Retriever>)
    }));

    registry.register(
        "vector",
        "Text and image kNN concatenated, sorted by raw score, deduped.",
        Box::new(|index, _params| Ok(Box::new(strategies::VectorRetriever::new(index)) as Box<dyn Retriever>)),
    );

    registry.register(
        "hybrid",
        "Legacy alias of `vector`: filters applied post-hoc after concatenation and dedup.",
        Box::new(|index, _params| Ok(Box::new(strategies::VectorRetriever::new(index)) as Box<dyn Retriever>)),
    );

    registry.register("bm25", "Sparse BM25 search over the text store.", Box::new(|index, _params| {
        Ok(Box::new(strategies::Bm25Retriever::new(index)) as Box<dyn Retriever>)
    }));

    registry.register(
        "rrf",
        "Text and image kNN fused by Reciprocal Rank Fusion.",
        Box::new(|index, params| {
            let k_rrf = parse_f32(params, "k_rrf", 60.0)?;
            let text_weight = parse_f32(params, "text_weight", 1.0)?;
            let image_weight = parse_f32(params, "image_weight", 1.0)?;
            Ok(Box::new(strategies::RrfRetriever::new(index, k_rrf, text_weight, image_weight)) as Box<dyn Retriever>)
        }),
    );

    registry.register(
        "weighted",
        "Text and image kNN, min-max normalized and linearly blended.",
        Box::new(|index, params| {
            let text_weight = parse_f32(params, "text_weight", 0.5)?;
            let image_weight = parse_f32(params, "image_weight", 0.5)?;
            Ok(Box::new(strategies::WeightedRetriever::new(index, text_weight, image_weight)) as Box<dyn Retriever>)
        }),
    );

    registry.register(
        "bm25_vector",
        "BM25 and text kNN fused by Reciprocal Rank Fusion with per-source weights.",
        Box::new(|index, params| {
            let k_rrf = parse_f32(params, "k_rrf", 60.0)?;
            let bm25_weight = parse_f32(params, "bm25_weight", 1.0)?;
            let vector_weight = parse_f32(params, "vector_weight", 1.0)?;
            Ok(Box::new(strategies::Bm25VectorRetriever::new(index, k_rrf, bm25_weight, vector_weight))
                as Box<dyn Retriever>)
        }),
    );

    registry.register(
        "bm25_vector_alpha",
        "BM25 and text kNN, min-max normalized and blended by a fixed alpha.",
        Box::new(|index, params| {
            let alpha = parse_f32(params, "alpha", 0.5)?.clamp(0.0, 1.0);
            Ok(Box::new(strategies::Bm25VectorAlphaRetriever::new(index, alpha)) as Box<dyn Retriever>)
        }),
    );

    registry.register(
        "adaptive",
        "BM25 and text kNN blended by an alpha derived from the query at request time.",
        Box::new(|index, _params| Ok(Box::new(strategies::AdaptiveRetriever::new(index)) as Box<dyn Retriever>)),
    );
}
