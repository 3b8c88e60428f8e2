//! # CLI Module
//!
//! Command-line front end of the generator.
//!
//! ## Commands
//!
//! ### `impl`
//!
//! Create or extend `svcimpl.rs` for the trait in `svc.rs`:
//!
//! ```bash
//! svcgen impl --dir src/greeter
//! ```
//!
//! ### `grpc`
//!
//! Create or extend the RPC implementation from a service document:
//!
//! ```bash
//! svcgen grpc --dir src/greeter --service greeter.yaml
//! ```
//!
//! ### `db`
//!
//! Introspect a database and generate models, queries, DTOs and a CRUD service:
//!
//! ```bash
//! svcgen db --dir src/users --driver postgres --dsn postgres://localhost/app --soft-delete
//! ```
//!
//! `--driver`, `--dsn` and `--table-prefix` fall back to `SVCGEN_DRIVER`, `SVCGEN_DSN`
//! and `SVCGEN_TABLE_PREFIX`, then to `svcgen.toml` in the target directory.
//!
//! ### `fix-imports`
//!
//! ```bash
//! svcgen fix-imports src/greeter/svcimpl.rs
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use clap::Parser;
//! use svcgen::cli::{run, Cli};
//!
//! run(Cli::parse())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{db_config, run, run_cli, Cli, Commands};
