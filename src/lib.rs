//! Purpose: Library crate behind the `tagfolders` CLI: tagging client plus user folders.
//! Exports: `api` (config, transport, tag store, folder engine) and `core` (errors, codecs).
//! Role: Callers depend on `api`; `core` holds the pure pieces it is built from.
//! Invariants: Core modules do no I/O; every network call lives under `api`.
pub mod api;
pub mod core;
