pub mod pool;
pub mod profile;
pub mod ranking;
pub mod recommendations;
pub mod retrieval;
pub mod scoring;

pub use pool::CandidatePool;
pub use profile::UserProfileLoader;
pub use ranking::normalize;
pub use recommendations::{RecommendationOverrides, RecommendationService};
pub use retrieval::{BranchOutput, CandidateRetriever, RetrievalOutcome};
pub use scoring::{ScoringEngine, Signals};
