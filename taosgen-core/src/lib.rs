//! Core data model and concurrency primitives for `taosgen`.
//!
//! This crate has no knowledge of wire formats or sinks: it owns the column
//! value model ([`cell`]), the row shape producers emit ([`row`]) and the
//! YAML-deserialized schema that describes a super table ([`schema`]). On top
//! of that it provides:
//!
//! - [`pool`]: the pre-allocated columnar memory pool producers and
//!   consumers hand blocks through.
//! - [`generators`]: per-column value generation (random, monotonic order,
//!   scripted expression) plus the composite [`generators::RowGenerator`].
//! - [`disorder`]: the out-of-order delivery injector layered on top of a
//!   row generator.
//! - [`pipeline`]: bounded multi-producer/multi-consumer queues connecting
//!   producer and consumer threads.
//! - [`pacing`]: inter-write timing strategies for consumer threads.
//! - [`checkpoint`]: periodic progress snapshots so an interrupted run can
//!   resume.
//! - [`gc`]: a background worker pool that frees large buffers off the hot
//!   path.
//!
//! `taosgen-format` builds wire-format encoders on top of [`cell`] and
//! [`row`]; `taosgen-cli` wires all of the above into a runnable load
//! generator.

pub mod cell;
pub mod checkpoint;
pub mod disorder;
pub mod error;
pub mod gc;
pub mod generators;
pub mod pacing;
pub mod pipeline;
pub mod pool;
pub mod row;
pub mod schema;
