//! Retriever Registry and Retrieval Strategies (§4.6, §4.7): a uniform `Query -> [Result]`
//! contract, ten composable strategies over the three stores owned by [`crate::index_manager`],
//! and the registry that selects among them by name at request time.

pub mod base;
pub mod fusion;
pub mod registry;
pub mod strategies;

pub use base::{dedup_by_memo, drop_below_min_score, filter_results, post_process, Query, RetrievalResult};
pub use fusion::{alpha_weighted_fusion, compute_adaptive_alpha, min_max_normalize, reciprocal_rank_fusion};
pub use registry::{register_default_strategies, RegistryError, RetrieverRegistry, StrategyDescription, StrategyParams};
pub use strategies::Retriever;

use thiserror::Error;

use crate::index_manager::IndexManagerError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RetrievalError {
    #[error(transparent)]
    Index(#[from] IndexManagerError),
}
