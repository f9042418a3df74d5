//! # pkgmirror
//!
//! Mirrors the download resources (source archives, version-control
//! checkouts, prebuilt bundles) needed to install a set of packages and
//! their transitive dependencies, so that installation can later proceed
//! with zero network access.
//!
//! The usual entry point is [`mirror::mirror_packages`] which resolves the
//! requested packages, fetches every resource not already cached, and
//! rewrites the on-disk documents consumed by the redirection shim.

pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::MirrorConfig;

pub mod registry;
pub use registry::Registry;
pub use registry::package::Package;

pub mod dependency_resolver;
pub mod resource;
pub mod download;
pub mod cache;
pub mod redirect;
pub mod manifest;
pub mod verify;
pub mod mirror;
