//! Status codes returned by curation tasks.

/// Task did not set a status.
pub const CURATE_UNSET: i32 = -3;
/// No task by that name.
pub const CURATE_NOTASK: i32 = -2;
/// Task could not run.
pub const CURATE_ERROR: i32 = -1;
pub const CURATE_SUCCESS: i32 = 0;
pub const CURATE_FAIL: i32 = 1;
/// Object was not applicable to the task.
pub const CURATE_SKIP: i32 = 2;

pub fn label(status: i32) -> &'static str {
    match status {
        CURATE_UNSET => "unset",
        CURATE_NOTASK => "notask",
        CURATE_ERROR => "error",
        CURATE_SUCCESS => "success",
        CURATE_FAIL => "fail",
        CURATE_SKIP => "skip",
        _ => "other",
    }
}
