//! Prelude for common imports used throughout the crate

pub use crate::error::{Error, Result};
pub use tracing::{debug, error, info, trace, warn};
