//! Persistent media store.
//!
//! Results of a scan are written to SQLite so that later tools (the
//! `replicate` subcommand) can work without rescanning.
//!
//! # Tables
//!
//! * `media`: one row per base name, with the path analysis and every
//!   occurrence as a JSON array.
//! * `duplicates`: one row per path belonging to a duplicate set.
//!
//! Both use `INSERT OR IGNORE`, so rerunning a scan keeps the first row seen
//! for a key and reports it as already present.

pub mod database;

pub use database::{InsertCounts, MediaRow, MediaStore, StoreError, StoreResult};
