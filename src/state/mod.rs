//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunRegistry`: the in-memory set of website identities already sent to analysis
//! - `ReviewStatus`: the review verdict carried by each analyzed lead

mod registry;
mod review_state;

// Re-export main types
pub use registry::RunRegistry;
pub use review_state::ReviewStatus;
