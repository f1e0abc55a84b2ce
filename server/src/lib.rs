//! # Team Server Library
//!
//! This library provides the authoritative server side of the team membership
//! layer. It owns the catalog of available teams, records which team each
//! connected player belongs to, and keeps every client's roster view in sync.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Membership
//! The server is the only place where assignments change. Clients ask for a
//! change with a `TeamChangeRequest`; the server checks privileges, validates
//! the team against the catalog and then applies the change.
//!
//! ### Client Management
//! Handles the lifecycle of client connections:
//! - Connection establishment with a unique display name
//! - Heartbeats and timeout detection
//! - Cleanup of team assignments when a player leaves
//!
//! ### Roster Broadcasting
//! After every successful change the server sends one complete roster
//! snapshot to all connected clients. Snapshots always replace, never merge,
//! so a lost datagram is repaired by the next one or by `RequestSnapshot`.
//!
//! ## Architecture Design
//!
//! ### Single Serialized Context
//! All changes and their side effects run on the server loop in arrival
//! order: registry update, scoreboard mirror, change listeners, then the
//! roster broadcast. In-process callers go through [`network::ServerHandle`]
//! so their changes are ordered the same way.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets with bincode-encoded packets. Every packet fits in one
//! datagram; the roster size is capped so that this always holds.
//!
//! ## Module Organization
//!
//! - `client_manager`: connected players, names and timeouts
//! - `config`: runtime settings and the JSON team file
//! - `directory`: the player directory and privilege seams
//! - `network`: socket tasks and the main server loop
//! - `notifier`: in-process change listeners
//! - `registry`: the player to team map
//! - `scoreboard`: world-visible team state
//! - `teams`: the service tying the team core together
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use shared::TeamCatalog;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig {
//!         operators: vec!["admin".to_string()],
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(&config, TeamCatalog::defaults()).await?;
//!
//!     // Other tasks can listen for changes without touching the loop
//!     server.notifier().register("audit", |player, team| {
//!         println!("player {} joined {}", player, team);
//!     });
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod directory;
pub mod network;
pub mod notifier;
pub mod registry;
pub mod scoreboard;
pub mod teams;
