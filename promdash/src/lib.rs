//! The promdash Prometheus terminal dashboard.
//!
//! This library supports the promdash binary found elsewhere in this project.
//! The heart of it is [`exposition::parse`], which turns a Prometheus text
//! exposition payload into an ordered list of [`metric::Metric`] records. The
//! [`poller`] fetches payloads on a timer and the [`display`] renders the
//! records as a table.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod display;
pub mod exposition;
pub mod metric;
pub mod poller;
