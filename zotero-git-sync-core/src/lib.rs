#![doc = "zotero-git-sync-core: core logic library for zotero-git-sync."]

//! This crate contains the data models and pipeline for mirroring a Zotero
//! collection into a git repository. The CLI crate only adds argument
//! parsing, config file loading and logging setup on top.
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick an [`contract::ItemSource`]
//! (normally [`zotero::ZoteroClient`]) and call [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod error;
pub mod export;
pub mod git;
pub mod item;
pub mod lockfile;
pub mod normalize;
pub mod render;
pub mod synchronise;
pub mod zotero;

pub use error::{ApiError, ConfigError, GitError, SyncError};
