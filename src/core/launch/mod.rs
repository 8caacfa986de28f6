pub mod classpath;
pub mod memory;
pub mod natives;
pub mod task;

pub use classpath::{build_classpath, join_classpath};
pub use memory::{MemoryPolicy, SystemProfile};
pub use natives::{extract_archive, extract_natives, ExtractionFailure, ExtractionReport};
pub use task::{build_launch_plan, format_command_for_logs, spawn, LaunchConfig, LaunchPlan};
