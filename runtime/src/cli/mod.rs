//! CLI subcommand implementations for the wxcheck binary.

pub mod doctor;
pub mod output;
pub mod report_cmd;
pub mod run_cmd;
