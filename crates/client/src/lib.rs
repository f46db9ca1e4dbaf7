//! # AutoContext Client
//!
//! The facade over the whole pipeline. Transports (HTTP handlers, chat
//! integrations, the CLI) call [`AutoContextRagClient::add_entry`] and
//! [`AutoContextRagClient::get_entry`] and serialize the results verbatim.

pub mod api;
pub mod client;

pub use api::{AddEntryRequest, AddEntryResponse, GetEntryRequest, GetEntryResponse, RetrievedEntry};
pub use client::{AutoContextRagClient, ClientSettings, store_options};
