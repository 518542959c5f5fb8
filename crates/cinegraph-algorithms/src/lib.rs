pub mod common;
pub mod centrality;
pub mod pagerank;
pub mod community;
pub mod similarity;

pub use common::{GraphView, NodeId};
pub use centrality::{betweenness_centrality, degree_centrality};
pub use pagerank::{page_rank, PageRankConfig};
pub use community::{louvain, LouvainConfig, LouvainResult};
pub use similarity::{node_similarity, SimilarityConfig, SimilarityPair};
