//! # Generator Module
//!
//! The generator turns structured metadata into Rust source and merges it into files
//! that may already contain hand-written code.
//!
//! ## Overview
//!
//! Every run is additive. Existing files are parsed with `syn`, the pieces that are
//! missing are located by span, and the new text is spliced in as plain text edits.
//! Nothing outside those edits changes, so comments, formatting and hand-edited
//! bodies survive byte for byte. The merged text is parsed again before it is
//! written; output that is no longer valid Rust aborts the run.
//!
//! ## Architecture
//!
//! ```text
//! metadata → FnStub → askama templates → fresh file
//!                                  ↘
//! existing file → scan → missing set → merge edits → import fixer → atomic write
//! ```
//!
//! - [`stubs`] - [`stubs::FnStub`], the code model of one generated method
//! - [`templates`] - askama template data and rendering
//! - [`scan`] - which methods an implementation already defines, across the directory
//! - [`merge`] - span-located text edits on parsed files
//! - [`imports`] - the import fixer
//! - [`svcimpl`] - `svcimpl.rs` (plain, RPC and database flavors)
//! - [`svc`] - `svc.rs`, the service trait of database-backed services
//! - [`tables`] - model, query and DTO files per table
//! - [`writer`] - atomic writes and ownership checks
//! - [`marker`] - the `DO NOT EDIT` / `YOU CAN EDIT` markers
//!
//! ## Ownership
//!
//! | file                  | marker        | later runs                                  |
//! |-----------------------|---------------|---------------------------------------------|
//! | `svcimpl.rs`          | YOU CAN EDIT  | append missing methods, refresh marked ones |
//! | `svc.rs`              | YOU CAN EDIT  | append missing declarations                 |
//! | `dto/<table>.rs`      | YOU CAN EDIT  | never touched again                         |
//! | `model/*`, `query/*`  | DO NOT EDIT   | rewritten while the marker is present       |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use svcgen::generator::svcimpl::generate_svc_impl;
//! use svcgen::meta::extract::extract_interface_file;
//!
//! let iface = extract_interface_file("src/service/svc.rs".as_ref(), None)?;
//! generate_svc_impl("src/service".as_ref(), &iface)?;
//! ```

pub mod imports;
pub mod marker;
pub mod merge;
pub mod naming;
pub mod scan;
pub mod stubs;
pub mod svc;
pub mod svcimpl;
pub mod tables;
pub mod templates;
pub mod writer;

pub use imports::fix_imports;
pub use svc::generate_service_trait;
pub use svcimpl::{generate_impl, generate_rpc_impl, generate_svc_impl, ImplPlan};
pub use writer::WriteOutcome;
