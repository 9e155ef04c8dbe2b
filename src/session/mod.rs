//! Run session: the spawned process and its lifecycle controller

mod controller;
pub(crate) mod process;

pub use controller::{build_run_args, RunController};
pub use process::RunProcess;
