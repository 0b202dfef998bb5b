pub mod coordinator;
pub mod scheduler;

pub use coordinator::{DataCoordinator, LifecycleError};
pub use scheduler::{CleanupFn, JobFn, JobScheduler, JobSnapshot, JobSpec, RunSummary};
