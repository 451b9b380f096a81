//! NetBox REST API as an inventory backend

pub mod client;
mod inventory;
pub mod types;

pub use client::NetBoxClient;
