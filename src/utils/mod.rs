//! Terminal helpers
//!
//! - [`progress`] - spinners and the traversal report shown by `supply calc`

pub mod progress;
