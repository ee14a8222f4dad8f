//! State module for tracking work item progress
//!
//! # Components
//!
//! - `ItemState`: the lifecycle of one work item (pending, fetched, paginating, done, ...)
//! - `ItemTracker`: enforces legal transitions and counts fetched pages

mod item_state;

// Re-export main types
pub use item_state::{ItemState, ItemTracker};
