//! URL存活检测模块
//!
//! 包含URL规范化、单次HTTP探测、结果分类和批量并发检测

pub mod batch;
pub mod normalize;
pub mod probe;
pub mod result;

pub use batch::{BatchChecker, BatchProgress, ProgressCallback};
pub use normalize::{normalize, NormalizedUrl};
pub use probe::{HttpProber, ProbeFailure, ProbeResponse, Prober};
pub use result::{BatchSummary, CheckResult, FailureKind, LivenessStatus};
