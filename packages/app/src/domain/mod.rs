pub mod alternate_url;
pub mod canonical_job;
pub mod connector_checkpoint;
pub mod discovered_board;
pub mod fit_analysis;
pub mod job_duplicate;
pub mod raw_job;
pub mod retry_queue;
pub mod run_log;
pub mod source_metric;
pub mod types;

pub use alternate_url::{AlternateUrl, AlternateUrlId};
pub use canonical_job::{CanonicalJob, CanonicalJobId};
pub use connector_checkpoint::ConnectorCheckpoint;
pub use discovered_board::{DiscoveredBoard, DiscoveredBoardId};
pub use fit_analysis::FitAnalysis;
pub use job_duplicate::{JobDuplicate, JobDuplicateId};
pub use raw_job::{RawJob, RawJobId};
pub use retry_queue::{RetryQueueItem, RetryQueueItemId};
pub use run_log::{RunLog, RunLogId};
pub use source_metric::SourceMetric;
pub use types::{
    DedupMethod, JobStatus, PostedAtConfidence, ScoreBand, TitleBucket, Verdict, WorkMode,
};
