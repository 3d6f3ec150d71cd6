pub mod config;
pub mod conflict;
pub mod diagnosis;
pub mod evidence;
pub mod facts;
pub mod merge;
pub mod narrative;
pub mod normalize;
pub mod shorthand;
pub mod verify;

pub use config::{PipelineConfig, RiskWeights};
pub use conflict::{Conflict, ConflictType, detect_conflicts};
pub use diagnosis::{
    DiagnosisItem, DiagnosisResult, ExtractionQuality, ItemEvidence, ItemStatus, diagnose,
    diagnose_with,
};
pub use evidence::{EvidencedField, Source};
pub use facts::{ExtractedFacts, FactField, OtherItem};
pub use merge::{MergeOutcome, merge};
pub use normalize::normalize;
pub use verify::{VerificationResult, VerificationStatus, resolve};
