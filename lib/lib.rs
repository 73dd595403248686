//! This library crate contains all the re-usable parts of `remake`, a
//! make-like build tool driven by declarative `ReMakeFile` configuration
//! files.
//!
//! # The `ReMakeFile` format
//!
//! The [`remakefile`] module reads `ReMakeFile` files: builder
//! definitions, explicit rules, single-wildcard pattern rules, target
//! registration, virtual targets, and sub-directory declarations.
//!
//! # The engine
//!
//! - The [`graph`] module resolves registered goals into an ordered
//!   dependency list, and reports goals nothing can make as well as
//!   dependency cycles.
//!
//! - The [`mtime`] module reads file modification times (through a
//!   [`StatCache`][mtime::StatCache] which saves on `stat()` syscalls)
//!   and decides whether a target [should be
//!   rebuilt][mtime::should_rebuild].
//!
//! - The [`build`] module executes a directory: it loads the
//!   configuration, recurses into sub-directories, and builds or cleans
//!   the resolved targets in dependency order.
//!
//! # Building blocks
//!
//! - [`paths`] defines [`BuildPath`][paths::BuildPath] (a file or a
//!   virtual target) and [`Pattern`][paths::Pattern] (a path pattern
//!   with a single `*`).
//!
//! - [`builders`] defines the commands that realize rules, including the
//!   automatic variables `$@`, `$^` and `$<`, and the stock builders
//!   every ReMakeFile can use.
//!
//! - [`rules`] defines explicit rules and pattern rules.

pub mod build;
pub mod builders;
pub mod error;
pub mod graph;
pub mod mtime;
pub mod paths;
pub mod remakefile;
pub mod rules;
