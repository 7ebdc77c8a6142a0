// src/config/mod.rs

//! Workflow document loading and validation.
//!
//! - `model.rs`: the serde data model of the document.
//! - `loader.rs`: read TOML or YAML from disk.
//! - `validate.rs`: check the document and turn it into a [`Workflow`]
//!   with its graph attached.
//!
//! [`Workflow`]: crate::workflow::Workflow

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DocumentFormat, default_workflow_path, load_and_validate, load_from_path, load_with_policy,
    parse_str,
};
pub use model::{RawWorkflow, TaskConfig};
pub use validate::into_workflow;
