//! Server network layer handling UDP communications and the team request loop

use crate::client_manager::{Client, ClientManager, JoinError};
use crate::config::ServerConfig;
use crate::directory::OperatorList;
use crate::notifier::ChangeNotifier;
use crate::registry::MembershipRegistry;
use crate::scoreboard::Scoreboard;
use crate::teams::TeamService;
use log::{debug, error, info, warn};
use shared::{
    check_player_name, check_team_change, decode_packet, encode_packet, Packet, PlayerId,
    TeamAssignment, TeamCatalog, TeamError, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from network tasks and handles to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    AssignTeam {
        player_id: PlayerId,
        team_id: String,
        reply: oneshot::Sender<Result<TeamAssignment, TeamError>>,
    },
    Shutdown,
}

/// Messages sent from the server loop to the network sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error(transparent)]
    Team(#[from] TeamError),

    #[error("server is not running")]
    Closed,
}

/// Cloneable handle for in-process callers.
///
/// Requests are marshalled onto the server loop, so team changes made here
/// run their side effects in the same order as network requests.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub async fn assign_team(
        &self,
        player_id: PlayerId,
        team_id: &str,
    ) -> Result<TeamAssignment, HandleError> {
        let (reply, response) = oneshot::channel();
        self.server_tx
            .send(ServerMessage::AssignTeam {
                player_id,
                team_id: team_id.to_string(),
                reply,
            })
            .map_err(|_| HandleError::Closed)?;

        Ok(response.await.map_err(|_| HandleError::Closed)??)
    }

    pub fn shutdown(&self) {
        let _ = self.server_tx.send(ServerMessage::Shutdown);
    }
}

/// Main server coordinating networking and team membership
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    teams: TeamService<Scoreboard>,
    operators: OperatorList,
    operator_token: Option<String>,
    broadcast_on_disconnect: bool,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(config: &ServerConfig, catalog: TeamCatalog) -> Result<Self, BoxError> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(config.bind_addr.as_str()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let teams = TeamService::new(catalog, Scoreboard::new(), outbound_tx.clone());
        let operators = OperatorList::new(&config.operators);
        if operators.is_empty() {
            warn!("No operators configured, team change requests will be refused");
        } else if config.operator_token.is_none() {
            warn!("Operators configured without an operator token, nobody can change teams");
        }

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::with_timeout(
                config.max_clients,
                config.client_timeout,
            ))),
            teams,
            operators,
            operator_token: config.operator_token.clone(),
            broadcast_on_disconnect: config.broadcast_on_disconnect,
            tasks: Vec::new(),
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    pub fn teams(&self) -> &TeamService<Scoreboard> {
        &self.teams
    }

    pub fn registry(&self) -> Arc<MembershipRegistry> {
        Arc::clone(self.teams.registry())
    }

    pub fn notifier(&self) -> Arc<ChangeNotifier> {
        Arc::clone(self.teams.notifier())
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode_packet(&buffer[..len]) {
                        Ok(packet) => {
                            debug!("Received {:?} from {}", packet, addr);
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut outbound_rx =
            std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&mut self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        }));
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = encode_packet(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self
            .outbound_tx
            .send(OutboundMessage::SendPacket { packet, addr })
        {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect {
            client_version,
            player_name,
            operator_token,
        } = packet
        {
            self.handle_connect(client_version, player_name, operator_token, addr)
                .await;
            return;
        }

        // Every other packet needs a session and keeps it alive
        let client_id = { self.clients.write().await.touch(addr) };
        let Some(client_id) = client_id else {
            warn!("Packet from unknown address {}", addr);
            return;
        };

        match packet {
            Packet::Heartbeat => {}

            Packet::RequestSnapshot => {
                let roster = {
                    let clients = self.clients.read().await;
                    self.teams.snapshot(&*clients)
                };
                self.send_packet(Packet::roster(&roster), addr);
            }

            Packet::TeamChangeRequest {
                target_name,
                team_id,
            } => {
                self.handle_team_change(client_id, &target_name, &team_id, addr)
                    .await;
            }

            Packet::Disconnect => {
                let removed = { self.clients.write().await.remove_client(&client_id) };
                if removed {
                    self.forget_player(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn handle_connect(
        &mut self,
        client_version: u32,
        player_name: String,
        operator_token: Option<String>,
        addr: SocketAddr,
    ) {
        info!(
            "Client connecting from {} as {:?} (version: {})",
            addr, player_name, client_version
        );

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        if let Err(e) = check_player_name(&player_name) {
            self.send_packet(
                Packet::Disconnected {
                    reason: e.to_string(),
                },
                addr,
            );
            return;
        }

        // A name held by another address is refused before the old session
        // at this address is touched
        let held_elsewhere = {
            let clients = self.clients.read().await;
            clients
                .find_client_by_name(&player_name)
                .is_some_and(|client| client.addr != addr)
        };
        if held_elsewhere {
            warn!("Refusing {} from {}: name in use", player_name, addr);
            self.send_packet(
                Packet::Disconnected {
                    reason: JoinError::NameTaken(player_name).to_string(),
                },
                addr,
            );
            return;
        }

        // Remove existing connection if present
        let existing_client_id = { self.clients.read().await.find_client_by_addr(addr) };
        if let Some(existing_id) = existing_client_id {
            info!("Removing existing client {} from {}", existing_id, addr);
            self.clients.write().await.remove_client(&existing_id);
            self.forget_player(existing_id).await;
        }

        let verified = match (&self.operator_token, &operator_token) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        };
        if operator_token.is_some() && !verified {
            warn!("{} from {} presented a wrong operator token", player_name, addr);
        }

        let result = {
            let mut clients = self.clients.write().await;
            let result = clients.add_client(addr, &player_name);
            if let (Ok(client_id), true) = (&result, verified) {
                clients.mark_verified(*client_id);
            }
            result
        };
        match result {
            Ok(client_id) => {
                self.send_packet(Packet::Connected { client_id }, addr);
                self.send_packet(
                    Packet::Catalog {
                        teams: self.teams.catalog().entries().to_vec(),
                    },
                    addr,
                );
            }
            Err(e) => {
                warn!("Refusing {} from {}: {}", player_name, addr, e);
                self.send_packet(
                    Packet::Disconnected {
                        reason: e.to_string(),
                    },
                    addr,
                );
            }
        }
    }

    async fn handle_team_change(
        &mut self,
        client_id: u32,
        target_name: &str,
        team_id: &str,
        addr: SocketAddr,
    ) {
        if let Err(e) = check_team_change(target_name, team_id) {
            warn!("Rejected team change from {}: {}", addr, e);
            self.send_packet(Packet::error(e.to_string()), addr);
            return;
        }

        let result = {
            let clients = self.clients.read().await;
            let Some(requester) = clients.get(client_id).map(Client::player) else {
                return;
            };
            self.teams.handle_change_request(
                &requester,
                target_name,
                team_id,
                &*clients,
                &self.operators,
            )
        };

        let notice = match result {
            Ok(target) => Packet::info(format!(
                "Assigned {} to {}",
                target.name,
                self.teams.catalog().display_name(team_id)
            )),
            Err(e) => {
                warn!("Rejected team change from {}: {}", addr, e);
                Packet::error(e.to_string())
            }
        };
        self.send_packet(notice, addr);
    }

    async fn handle_assign(
        &mut self,
        player_id: PlayerId,
        team_id: &str,
    ) -> Result<TeamAssignment, TeamError> {
        let clients = self.clients.read().await;
        if clients.get(player_id.0).is_none() {
            return Err(TeamError::PlayerNotFound(player_id.to_string()));
        }
        self.teams.assign(player_id, team_id, &*clients)
    }

    /// Drops a departed player's team and applies the disconnect broadcast policy
    async fn forget_player(&mut self, client_id: u32) {
        let had_team = self.teams.remove(PlayerId(client_id));
        if had_team && self.broadcast_on_disconnect {
            let clients = self.clients.read().await;
            self.teams.broadcast_roster(&*clients);
        }
    }

    /// Tells every connected client the server is going away
    async fn notify_shutdown(&self) {
        let packet = Packet::Disconnected {
            reason: "Server shutting down".to_string(),
        };
        let client_addrs = { self.clients.read().await.get_client_addrs() };

        for (client_id, addr) in client_addrs {
            if let Err(e) = Self::send_packet_impl(&self.socket, &packet, addr).await {
                error!("Failed to send shutdown to client {}: {}", client_id, e);
            }
        }
    }

    /// Main server loop; the single context where team changes take effect
    pub async fn run(&mut self) -> Result<(), BoxError> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ClientTimeout { client_id } => {
                    info!("Client {} timed out", client_id);
                    self.forget_player(client_id).await;
                }
                ServerMessage::AssignTeam {
                    player_id,
                    team_id,
                    reply,
                } => {
                    let result = self.handle_assign(player_id, &team_id).await;
                    let _ = reply.send(result);
                }
                ServerMessage::Shutdown => break,
            }
        }

        info!("Server shutting down");
        self.notify_shutdown().await;
        self.teams.shutdown();
        for task in self.tasks.drain(..) {
            task.abort();
        }

        Ok(())
    }
}
