//! # memoria-core
//!
//! Multi-modal, hybrid semantic search retrieval core for user-authored memos (notes) with
//! image and text attachments.
//!
//! A memo is decomposed by the [`builder`] module into a small set of semantic sub-documents
//! (base text, attachment text, per-image caption) which [`index_manager`] embeds and writes
//! into three parallel persistent stores: a dense text store, a dense image store, and a BM25
//! inverted index. [`retrieval`] exposes ten composable strategies over those stores behind one
//! uniform `Query -> [Result]` contract, selected at request time through a
//! [`retrieval::RetrieverRegistry`].
//!
//! ## Data flow
//!
//! ```text
//! Memo --[builder]--> nodes --[index_manager::upsert]--> {text store, image store, bm25}
//!                                                              |
//! Query --[retrieval strategy]--------------------------------+--> [RetrievalResult]
//! ```
//!
//! ## Feature Flags
//!
//! - `vector-search` (default): enables the HNSW-backed dense stores ([`vector_store`]) and
//!   everything built on top of them ([`index_manager`], [`retrieval`], [`ingest`],
//!   [`rebuild`]). Disabling it leaves the document model, BM25 index, and embedding/caption
//!   adapters usable on their own.
//! - `full`: the complete feature set a composition root needs; currently equivalent to
//!   `vector-search`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bm25;
pub mod builder;
pub mod caption;
pub mod config;
pub mod embeddings;
pub mod manifest;
pub mod memo_source;
pub mod model;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod vector_store;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod index_manager;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod retrieval;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod ingest;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod rebuild;

pub use builder::{BuilderConfig, BuilderError, BuiltDocuments};
pub use caption::{CaptionError, CaptionProvider};
pub use config::{Config, ConfigError};
pub use embeddings::{EmbeddingAdapter, EmbeddingError};
pub use manifest::{Manifest, ManifestError, MemoEntry};
pub use memo_source::{HttpMemoSource, MemoSource, ProviderError};
pub use model::{Attachment, AttachmentContent, Memo, MemoProperty, Node, NodeKind};

#[cfg(feature = "vector-search")]
pub use index_manager::{
    DeleteOutcome, Hit, IndexManager, IndexManagerError, IndexStatus, MemoInfo, UpsertOutcome,
};

#[cfg(feature = "vector-search")]
pub use ingest::{IngestError, IngestOutcome, IngestionPipeline};

#[cfg(feature = "vector-search")]
pub use rebuild::{RebuildManager, RebuildState, RebuildStatus, StateError};

#[cfg(feature = "vector-search")]
pub use retrieval::{
    register_default_strategies, Query, RegistryError, RetrievalError, RetrievalResult, Retriever,
    RetrieverRegistry, StrategyDescription, StrategyParams,
};

#[cfg(feature = "vector-search")]
pub use vector_store::{Collection, StoreError, StoredNode, VectorIndexConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for the common case of wiring up an ingestion pipeline and a retriever
/// registry in a composition root.
pub mod prelude {
    pub use crate::{Config, ConfigError, Memo, MemoProperty};
    pub use crate::{BuilderConfig, BuiltDocuments};
    pub use crate::{CaptionProvider, EmbeddingAdapter};

    #[cfg(feature = "vector-search")]
    pub use crate::{
        register_default_strategies, IndexManager, IngestionPipeline, Query, RebuildManager,
        RetrievalResult, Retriever, RetrieverRegistry,
    };
}
