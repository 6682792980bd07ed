//! Core traits for the dnsync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RemoteStore`]: Read and mutate records held by a DNS provider
//! - [`HistorySource`]: Read declaration files at two points in history

pub mod history;
pub mod remote_store;

pub use history::{
    FileChange, FileChangeKind, HistorySource, HistorySourceFactory, Revision, RevisionRange,
};
pub use remote_store::{RemoteStore, RemoteStoreFactory};
