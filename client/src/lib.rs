//! # Team Client Library
//!
//! This library provides the client side of the team membership layer. It
//! keeps a local copy of the server's roster, shows it on a team screen and
//! sends team change requests typed on the console.
//!
//! ## Architecture Overview
//!
//! ### Push, Not Poll
//! The server pushes a complete roster after every change. The client never
//! waits for a reply: `RequestSnapshot` is fire-and-forget, and whatever
//! roster arrives next simply replaces the cached one.
//!
//! ### Two Contexts
//! A receive task decodes datagrams and swaps the [`cache::ClientCache`]
//! contents. It then forwards a [`network::ClientEvent`] to the UI loop,
//! which is the only place the team screen is touched.
//!
//! ## Module Organization
//!
//! ### Cache Module (`cache`)
//! The last received roster, replaced whole on every update and read as an
//! owned copy.
//!
//! ### Console Module (`console`)
//! Parses stdin lines into commands: `open`, `close`, `refresh`, `teams`,
//! `set <player> <team>`, `click <row>`, `quit` and `help`.
//!
//! ### Network Module (`network`)
//! UDP socket handling, the receive task, heartbeats and the UI loop.
//!
//! ### Screen Module (`screen`)
//! The rows-of-(label, action) view model and a plain text renderer.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", "alice").await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod console;
pub mod network;
pub mod screen;
