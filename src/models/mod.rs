pub mod features;
pub mod profile;
pub mod report;
pub mod track;

pub use features::{FeatureThresholds, FeatureVector};
pub use profile::{ProfileSummary, TempoRange, UserSnapshot};
pub use report::{
    PoolStats, RecommendationReport, ReportEntry, RunDiagnostics, RunWarning, ScoredCandidate,
};
pub use track::{Branch, Candidate};
