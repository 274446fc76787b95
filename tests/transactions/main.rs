//! End-to-end transaction tests through the public API.

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod end_to_end;
mod failure_policy;
