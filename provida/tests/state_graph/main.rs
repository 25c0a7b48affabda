//! StateGraph integration tests: compile-time validation, invocation,
//! cancellation and checkpoint-based resume.

#[path = "../init_logging.rs"]
mod init_logging;

mod common;
mod compile_fail;
mod invoke;
mod resume;
