//! Client connection management for the team server
//!
//! This module handles the server-side bookkeeping of connected players:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Display name uniqueness and capacity limits
//! - Address lookup for routing incoming packets to a session
//!
//! The client manager is also the live player directory the team core uses
//! to resolve names and build roster snapshots.

use crate::directory::{ConnectedPlayer, PlayerDirectory};
use log::info;
use shared::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Server full")]
    ServerFull,

    #[error("Name already in use: {0}")]
    NameTaken(String),
}

/// Represents a connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Display name chosen at connect time
    pub name: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Presented the configured operator token at connect time
    pub verified: bool,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, name: String) -> Self {
        Self {
            id,
            addr,
            name,
            last_seen: Instant::now(),
            verified: false,
        }
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if no packets have been received from this client
    /// within the specified timeout duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    pub fn player(&self) -> ConnectedPlayer {
        ConnectedPlayer {
            id: PlayerId(self.id),
            name: self.name.clone(),
            addr: self.addr,
            verified: self.verified,
        }
    }
}

/// Manages all connected clients
///
/// The ClientManager provides centralized control over client connections
/// and enforces server capacity limits and unique display names.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    /// Silence after which a client is dropped
    timeout: Duration,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Fails if the server is at capacity or another connected player
    /// already uses the name (compared case-insensitively).
    pub fn add_client(&mut self, addr: SocketAddr, name: &str) -> Result<u32, JoinError> {
        if self.clients.len() >= self.max_clients {
            return Err(JoinError::ServerFull);
        }

        if self.find_client_by_name(name).is_some() {
            return Err(JoinError::NameTaken(name.to_string()));
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let client = Client::new(client_id, addr, name.to_string());
        info!("Client {} ({}) connected from {}", client_id, name, addr);
        self.clients.insert(client_id, client);

        Ok(client_id)
    }

    /// Removes a client from the server
    ///
    /// Returns true if the client was found and removed, false if they were
    /// already gone. This handles both explicit disconnections and timeouts.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.name);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn find_client_by_name(&self, name: &str) -> Option<&Client> {
        let name = name.to_lowercase();
        self.clients
            .values()
            .find(|client| client.name.to_lowercase() == name)
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Records that the client proved the operator token
    pub fn mark_verified(&mut self, client_id: u32) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.verified = true;
                true
            }
            None => false,
        }
    }

    /// Marks the client at `addr` as alive and returns its ID
    pub fn touch(&mut self, addr: SocketAddr) -> Option<u32> {
        let client = self.clients.values_mut().find(|client| client.addr == addr)?;
        client.last_seen = Instant::now();
        Some(client.id)
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed client IDs so the team core can drop their
    /// assignments as well.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timeout = self.timeout;
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Gets all client IDs and their network addresses
    ///
    /// Used for broadcasting roster updates to all connected clients.
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl PlayerDirectory for ClientManager {
    fn connected_players(&self) -> Vec<ConnectedPlayer> {
        self.clients.values().map(Client::player).collect()
    }

    fn find_by_display_name(&self, name: &str) -> Option<ConnectedPlayer> {
        self.find_client_by_name(name).map(Client::player)
    }
}
