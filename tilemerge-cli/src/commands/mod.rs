//! CLI command implementations.
//!
//! - [`init`] - Write a default config file
//! - [`serve`] - Run the tile server
//! - [`tile`] - Run the pipeline for one tile and save the result
//! - [`inspect`] - Print the layers and identifiers of a stored tile

pub mod common;
pub mod init;
pub mod inspect;
pub mod serve;
pub mod tile;
