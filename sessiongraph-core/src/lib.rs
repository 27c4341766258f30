pub mod cache;
pub mod config;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod models;
pub mod prompts;

pub use cache::{CacheEntry, CacheError, CacheStore};
pub use config::SessionGraphConfig;
pub use extraction::{
    create_backend, AnthropicConfig, AnthropicExtractionClient, BackendConfig, ExtractionBackend,
    ExtractionError, OfflineBackend,
};
pub use error::GraphError;
pub use graph::{merge_graphs, read_graph_file, session_graph, write_graph_file, GraphFile};
