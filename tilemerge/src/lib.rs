//! TileMerge - vector tile serving with live feature overrides
//!
//! This library serves precomputed vector tiles out of an MBTiles file and
//! rewrites feature names and colours on the way out, using override records
//! fetched from an external store keyed by each feature's `merge_id`.
//!
//! # Request Pipeline
//!
//! ```text
//! TileStore ──► codec::decode ──► OverrideResolver ──► patch ──► codec::encode
//!  (MBTiles)     (gzip + MVT)      (one batch query)            (gzip + MVT)
//! ```
//!
//! Every request re-reads and re-patches its tile; nothing is cached between
//! requests.

use std::future::Future;
use std::pin::Pin;

pub mod app;
pub mod codec;
pub mod config;
pub mod coord;
pub mod http;
pub mod logging;
pub mod overrides;
pub mod patch;
pub mod service;
pub mod store;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
