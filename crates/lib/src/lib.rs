//! xpiup-lib: build and release bookkeeping for browser extensions
//!
//! This crate provides everything behind the `xpiup` commands:
//! - `build`: zip the extension, optionally beta-labelled or for a platform variant
//! - `dev`: switch the working manifest to a platform variant
//! - `deploy`: record a signed artifact in `updates.json` and the README badges
//! - `updates`: the update manifest and release-line reconciliation
//! - `host`: platform adapters for directory listing, hashing and URL opening

pub mod archive;
pub mod artifact;
pub mod build;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod dev;
pub mod gateway;
pub mod help;
pub mod host;
pub mod manifest;
pub mod platform;
pub mod readme;
pub mod updates;
pub mod version;
