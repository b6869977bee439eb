use std::sync::atomic::{AtomicU64, Ordering};

// Single static counter for all generation jobs
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

pub fn generate_job_id() -> u64 {
    NEXT_JOB_ID.fetch_add(1, Ordering::SeqCst)
}
