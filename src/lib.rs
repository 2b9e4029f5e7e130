//! tagsync library - mirror the currently playing track onto a BusyTag.
//!
//! The binary is a thin shell over these modules; they are exposed for
//! tests and for embedding the sync loop elsewhere.
//!
//! # Modules
//!
//! - `quantize` / `palette`: reduce artwork to candidate colors and pick one
//! - `snapshot` / `state` / `sync`: change detection and the sync loop
//! - `source`: where track information comes from
//! - `render`: the composited device image
//! - `device`: where updates are written
//! - `config`, `error`, `logging`, `cli`: the ambient plumbing
#![forbid(unsafe_code)]

pub mod cli;
pub mod color;
pub mod config;
pub mod device;
pub mod error;
pub mod image_ops;
pub mod logging;
pub mod palette;
pub mod quantize;
pub mod render;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod sync;

pub use error::{Result, TagError};
