pub mod bin_common;

/// Small helpers that do not warrant a module tree of their own.
pub mod utils;
