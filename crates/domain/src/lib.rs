//! `sa-domain` — shared types, config, and error taxonomy for the mandrake
//! workspace.
//!
//! Every other crate in the workspace depends on this one for the
//! provider-agnostic wire types (`tool`, `stream`), the error taxonomy that
//! maps to the HTTP boundary's fixed status table, and the `Config` tree
//! loaded at startup.

pub mod capability;
pub mod config;
pub mod error;
pub mod stream;
pub mod tool;
pub mod trace;
