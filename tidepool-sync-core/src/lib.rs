#![doc = "tidepool-sync-core: core logic library for tidepool-sync."]

//! This crate contains the data models, builders and sync pipelines that move
//! Tidepool device data into Nightscout, plus the Tidepool HTTP client.
//! The Nightscout client and the CLI live in the `tidepool-sync` crate.
//!
//! # Usage
//! Implement [`contract::TidepoolSource`] and [`contract::NightscoutTarget`]
//! (or use the mocks) and call the entrypoints in [`synchronise`].

pub mod config;
pub mod contract;
pub mod nightscout;
pub mod profile;
pub mod synchronise;
pub mod tidepool;
pub mod tidepool_client;
pub mod treatment;
