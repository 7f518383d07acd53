// Background job runners. The rebuild job is the repair loop for the
// non-transactional update path and can be triggered via:
// - CronJob (Kubernetes), REBUILD_RUN_ONCE=true
// - standalone looping process, REBUILD_RUN_ONCE=false
// - on demand from an operational shell

pub mod rebuild;

pub use rebuild::{run_rebuild_job, RebuildJob, RebuildStats, SnapshotSource, UserSource};
