//! Owned SVG document model for the DOM tools.
//!
//! Parsing goes through roxmltree and is converted into an owned tree the
//! set/clean operations can mutate; serialization is namespace-preserving.

pub mod clean;
pub mod edit;
pub mod selector;
pub mod tree;
