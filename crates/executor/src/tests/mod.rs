//! Test modules for the executor crate.


use ovstxn_core::{CommitStatus, Connection, Result};
use ovstxn_storage::testing::vswitch_schema;
use ovstxn_storage::MemoryDatabase;

use crate::CommandHandle;

/// Create an empty database with the test schema.
pub(crate) fn create_test_database() -> MemoryDatabase {
    MemoryDatabase::new(vswitch_schema())
}

/// Run `handles` in one attempt and commit it, finalizing on success.
pub(crate) fn run_and_commit(db: &MemoryDatabase, handles: &[CommandHandle]) -> Result<CommitStatus> {
    let mut conn = db.connect();
    let mut attempt = conn.begin_attempt();
    for handle in handles {
        handle.run(attempt.as_mut())?;
    }
    let status = attempt.commit_block();
    if matches!(status, CommitStatus::Success | CommitStatus::Unchanged) {
        for handle in handles {
            handle.finalize(attempt.as_ref());
        }
    }
    Ok(status)
}

/// Run a single command and return its result.
pub(crate) fn run_one(db: &MemoryDatabase, handle: &CommandHandle) -> Result<crate::Output> {
    run_and_commit(db, std::slice::from_ref(handle))?;
    Ok(handle.result())
}
