pub mod actions;
pub mod config;
pub mod document;
pub mod dom;
pub mod error;
pub mod workspace;

pub use actions::{ActionPlan, SAFE_ACTIONS, action_id, inkscape_command, is_safe_action, validate_actions};
pub use config::InkscapeConfig;
pub use document::{DocSource, ExportArea, ExportFormat, ExportSpec};
pub use dom::clean::{CleanOptions, clean_document};
pub use dom::edit::{SetOp, apply_set_ops};
pub use dom::selector::{CssSelector, Selector, SelectorType, validate_selector};
pub use dom::tree::{SvgDocument, SvgElement, SvgNode};
pub use error::InkscapeError;
pub use workspace::{Workspace, random_hex};
