//! Persisted configuration: run profiles and workspace settings

mod store;
mod types;

pub use store::{add_profile, rename_profile, ProfileStore};
pub use types::{ConfigFile, RunProfile, DEFAULT_ENTRYPOINT, DEFAULT_PROFILE_NAME};
