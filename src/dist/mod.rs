// src/dist/mod.rs

//! Distribution packaging: the manifest the core assembles and the packager
//! seam that consumes it.

pub mod manifest;
pub mod packager;

pub use manifest::DistributionManifest;
pub use packager::{CommandPackager, MANIFEST_ENV, Packager, PackagerFuture};
