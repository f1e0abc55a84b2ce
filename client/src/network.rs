use crate::cache::ClientCache;
use crate::console::{Command, HELP};
use crate::screen::{Renderer, TeamScreen, TextRenderer};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use shared::{
    decode_packet, encode_packet, roster_from_entries, NoticeLevel, Packet, Roster, TeamCatalog,
    MAX_DATAGRAM_SIZE, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Decoded server traffic forwarded from the receive task to the UI loop
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected { client_id: u32 },
    Catalog(TeamCatalog),
    RosterUpdated(Roster),
    Notice { level: NoticeLevel, text: String },
    Disconnected { reason: String },
}

/// Decodes one datagram on the receive side.
///
/// Roster snapshots replace the cache here, before the UI hears about them.
/// Malformed packets are dropped whole.
pub fn handle_datagram(data: &[u8], cache: &ClientCache) -> Option<ClientEvent> {
    let packet = match decode_packet(data) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Dropping packet from server: {}", e);
            return None;
        }
    };

    match packet {
        Packet::Connected { client_id } => Some(ClientEvent::Connected { client_id }),
        Packet::Catalog { teams } => Some(ClientEvent::Catalog(TeamCatalog::from_entries(teams))),
        Packet::RosterSnapshot { entries } => match roster_from_entries(entries) {
            Ok(roster) => {
                debug!("Roster update with {} players", roster.len());
                cache.replace(roster.clone());
                Some(ClientEvent::RosterUpdated(roster))
            }
            Err(e) => {
                warn!("Dropping roster from server: {}", e);
                None
            }
        },
        Packet::Notice { level, text } => Some(ClientEvent::Notice { level, text }),
        Packet::Disconnected { reason } => Some(ClientEvent::Disconnected { reason }),
        other => {
            warn!("Unexpected packet type from server: {:?}", other);
            None
        }
    }
}

/// Team that follows `current` in catalog order, wrapping around
pub fn next_team(catalog: &TeamCatalog, current: &str) -> Option<String> {
    let entries = catalog.entries();
    if entries.is_empty() {
        return None;
    }
    let next = entries
        .iter()
        .position(|entry| entry.team_id == current)
        .map(|index| (index + 1) % entries.len())
        .unwrap_or(0);
    Some(entries[next].team_id.clone())
}

pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    player_name: String,
    operator_token: Option<String>,
    client_id: Option<u32>,
    connected: bool,

    cache: Arc<ClientCache>,
    catalog: Arc<RwLock<TeamCatalog>>,
    screen: TeamScreen,
    renderer: Box<dyn Renderer + Send>,

    clicks_rx: mpsc::UnboundedReceiver<(String, String)>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        player_name: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let server_addr = server_addr.parse()?;

        let catalog = Arc::new(RwLock::new(TeamCatalog::defaults()));
        let (clicks_tx, clicks_rx) = mpsc::unbounded_channel();

        let names = Arc::clone(&catalog);
        let screen = TeamScreen::new("Teams", move |team_id| {
            names.read().display_name(team_id).to_string()
        })
        .with_click_handler(move |player, team_id| {
            let _ = clicks_tx.send((player.to_string(), team_id.to_string()));
        });

        Ok(Client {
            socket,
            server_addr,
            player_name: player_name.to_string(),
            operator_token: None,
            client_id: None,
            connected: false,
            cache: Arc::new(ClientCache::new()),
            catalog,
            screen,
            renderer: Box::new(TextRenderer::new(std::io::stdout())),
            clicks_rx,
        })
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer + Send>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Token the server checks before granting operator privilege
    pub fn with_operator_token(mut self, token: Option<String>) -> Self {
        self.operator_token = token;
        self
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    pub fn screen(&self) -> &TeamScreen {
        &self.screen
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server as {}...", self.player_name);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            player_name: self.player_name.clone(),
            operator_token: self.operator_token.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode_packet(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Fire-and-forget; the roster arrives later as a [`ClientEvent`]
    pub async fn request_snapshot(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.send_packet(&Packet::RequestSnapshot).await
    }

    pub async fn request_team_change(
        &self,
        target_name: &str,
        team_id: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.send_packet(&Packet::TeamChangeRequest {
            target_name: target_name.to_string(),
            team_id: team_id.to_string(),
        })
        .await
    }

    /// Sends a request the UI loop does not wait on. A failed send is
    /// logged and the session carries on.
    async fn send_or_log(&self, packet: &Packet) {
        if let Err(e) = self.send_packet(packet).await {
            error!("Failed to send {:?}: {}", packet, e);
        }
    }

    /// Spawns task that decodes server packets off the UI loop
    fn spawn_receiver(&self, event_tx: mpsc::UnboundedSender<ClientEvent>) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let cache = Arc::clone(&self.cache);
        let server_addr = self.server_addr;

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if addr != server_addr {
                            warn!("Ignoring packet from {}", addr);
                            continue;
                        }
                        if let Some(event) = handle_datagram(&buffer[..len], &cache) {
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        })
    }

    fn render(&mut self) {
        if let Err(e) = self.renderer.render(&self.screen) {
            error!("Failed to render team screen: {}", e);
        }
    }

    /// Applies one server event on the UI loop. Returns false once the
    /// server has closed the session.
    pub async fn handle_event(&mut self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                self.send_or_log(&Packet::RequestSnapshot).await;
            }

            ClientEvent::Catalog(catalog) => {
                info!("Received {} teams from server", catalog.len());
                *self.catalog.write() = catalog;
            }

            ClientEvent::RosterUpdated(roster) => {
                if self.screen.is_open() {
                    self.screen.update_team_data(&roster);
                    self.render();
                }
            }

            ClientEvent::Notice { level, text } => match level {
                NoticeLevel::Info => println!("{}", text),
                NoticeLevel::Error => println!("error: {}", text),
            },

            ClientEvent::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
                return false;
            }
        }

        true
    }

    /// Runs one console command. Returns false when the user quits.
    pub async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Open => {
                self.send_or_log(&Packet::RequestSnapshot).await;
                self.screen.open(&self.cache.snapshot());
                self.render();
            }
            Command::Close => self.screen.close(),
            Command::Refresh => self.send_or_log(&Packet::RequestSnapshot).await,
            Command::Teams => {
                let roster = self.cache.snapshot();
                if roster.is_empty() {
                    println!("(no players on a team)");
                }
                let catalog = self.catalog.read().clone();
                for (player, team_id) in roster {
                    println!("{}: {}", player, catalog.display_name(&team_id));
                }
            }
            Command::Set { player, team } => {
                self.send_or_log(&Packet::TeamChangeRequest {
                    target_name: player,
                    team_id: team,
                })
                .await
            }
            Command::Click(row) => {
                if !self.screen.is_open() {
                    println!("Open the team screen first");
                } else if !self.screen.click(row - 1) {
                    println!("No row {}", row);
                }
            }
            Command::Quit => return false,
            Command::Help => println!("{}", HELP),
        }

        true
    }

    async fn handle_click(&mut self, player: &str, team_id: &str) {
        let next = next_team(&self.catalog.read(), team_id);
        if let Some(next) = next {
            info!("Requesting {} move to {}", player, next);
            self.send_or_log(&Packet::TeamChangeRequest {
                target_name: player.to_string(),
                team_id: next,
            })
            .await;
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let receiver = self.spawn_receiver(event_tx);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut heartbeat_interval = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    if !self.handle_event(event).await {
                        break;
                    }
                },

                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(command) => {
                            if !self.handle_command(command).await {
                                break;
                            }
                        }
                        Err(e) => println!("{}", e),
                    }
                },

                Some((player, team_id)) = self.clicks_rx.recv() => {
                    self.handle_click(&player, &team_id).await;
                },

                _ = heartbeat_interval.tick() => {
                    if self.connected {
                        self.send_or_log(&Packet::Heartbeat).await;
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }
        receiver.abort();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{RosterEntry, TeamEntry, BLUE_TEAM, RED_TEAM};

    fn roster(pairs: &[(&str, &str)]) -> Roster {
        pairs
            .iter()
            .map(|(name, team)| (name.to_string(), team.to_string()))
            .collect()
    }

    async fn client_with_server() -> (Client, UdpSocket) {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let client = Client::new(&addr, "alice")
            .await
            .unwrap()
            .with_renderer(Box::new(TextRenderer::new(std::io::sink())));
        (client, server)
    }

    async fn recv_packet(server: &UdpSocket) -> Packet {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), server.recv_from(&mut buf))
            .await
            .expect("no packet from client")
            .unwrap();
        decode_packet(&buf[..len]).unwrap()
    }

    #[test]
    fn test_roster_datagram_replaces_cache() {
        let cache = ClientCache::new();
        cache.replace(roster(&[("old", RED_TEAM)]));

        let packet = Packet::roster(&roster(&[("P1", BLUE_TEAM)]));
        let event = handle_datagram(&encode_packet(&packet).unwrap(), &cache);

        assert_eq!(
            event,
            Some(ClientEvent::RosterUpdated(roster(&[("P1", BLUE_TEAM)])))
        );
        assert_eq!(cache.snapshot(), roster(&[("P1", BLUE_TEAM)]));
    }

    #[test]
    fn test_roster_duplicates_last_wins() {
        let cache = ClientCache::new();
        let packet = Packet::RosterSnapshot {
            entries: vec![
                RosterEntry {
                    name: "P1".to_string(),
                    team_id: RED_TEAM.to_string(),
                },
                RosterEntry {
                    name: "P1".to_string(),
                    team_id: BLUE_TEAM.to_string(),
                },
            ],
        };

        handle_datagram(&encode_packet(&packet).unwrap(), &cache);
        assert_eq!(cache.team_of("P1").as_deref(), Some(BLUE_TEAM));
    }

    #[test]
    fn test_malformed_datagram_leaves_cache() {
        let cache = ClientCache::new();
        cache.replace(roster(&[("P1", RED_TEAM)]));

        let mut data = encode_packet(&Packet::roster(&roster(&[("P2", BLUE_TEAM)]))).unwrap();
        data.truncate(data.len() - 3);

        assert_eq!(handle_datagram(&data, &cache), None);
        assert_eq!(handle_datagram(&[0xff; 4], &cache), None);
        assert_eq!(cache.snapshot(), roster(&[("P1", RED_TEAM)]));
    }

    #[test]
    fn test_catalog_and_notice_datagrams() {
        let cache = ClientCache::new();
        let teams = vec![TeamEntry::from(shared::TeamInfo::new(
            "green",
            "Green Team",
            shared::TeamColor::Green,
        ))];

        let event = handle_datagram(
            &encode_packet(&Packet::Catalog { teams: teams.clone() }).unwrap(),
            &cache,
        );
        assert_eq!(
            event,
            Some(ClientEvent::Catalog(TeamCatalog::from_entries(teams)))
        );

        let event = handle_datagram(&encode_packet(&Packet::error("nope")).unwrap(), &cache);
        assert_eq!(
            event,
            Some(ClientEvent::Notice {
                level: NoticeLevel::Error,
                text: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_next_team_wraps() {
        let catalog = TeamCatalog::defaults();
        let first = catalog.entries()[0].team_id.clone();
        let second = catalog.entries()[1].team_id.clone();

        assert_eq!(next_team(&catalog, &first), Some(second.clone()));
        assert_eq!(next_team(&catalog, &second), Some(first.clone()));
        assert_eq!(next_team(&catalog, "unknown"), Some(first));
        assert_eq!(next_team(&TeamCatalog::from_entries(vec![]), RED_TEAM), None);
    }

    #[tokio::test]
    async fn test_connected_event_requests_snapshot() {
        let (mut client, server) = client_with_server().await;

        assert!(
            client
                .handle_event(ClientEvent::Connected { client_id: 7 })
                .await
        );

        assert_eq!(client.client_id(), Some(7));
        assert!(client.is_connected());
        assert_eq!(recv_packet(&server).await, Packet::RequestSnapshot);
    }

    #[tokio::test]
    async fn test_roster_event_updates_open_screen_only() {
        let (mut client, _server) = client_with_server().await;

        client
            .handle_event(ClientEvent::RosterUpdated(roster(&[("P1", RED_TEAM)])))
            .await;
        assert!(client.screen().rows().is_empty());

        client.handle_command(Command::Open).await;
        client
            .handle_event(ClientEvent::RosterUpdated(roster(&[("P2", BLUE_TEAM)])))
            .await;

        assert_eq!(client.screen().rows().len(), 1);
        assert_eq!(client.screen().rows()[0].label, "P2 - Blue Team");
    }

    #[tokio::test]
    async fn test_set_command_sends_change_request() {
        let (mut client, server) = client_with_server().await;

        client
            .handle_command(Command::Set {
                player: "bob".to_string(),
                team: RED_TEAM.to_string(),
            })
            .await;

        assert_eq!(
            recv_packet(&server).await,
            Packet::TeamChangeRequest {
                target_name: "bob".to_string(),
                team_id: RED_TEAM.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_click_requests_next_team() {
        let (mut client, server) = client_with_server().await;
        client.cache().replace(roster(&[("bob", RED_TEAM)]));

        client.handle_command(Command::Open).await;
        assert_eq!(recv_packet(&server).await, Packet::RequestSnapshot);

        client.handle_command(Command::Click(1)).await;
        let (player, team_id) = client.clicks_rx.try_recv().unwrap();
        client.handle_click(&player, &team_id).await;

        assert_eq!(
            recv_packet(&server).await,
            Packet::TeamChangeRequest {
                target_name: "bob".to_string(),
                team_id: BLUE_TEAM.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_disconnect_and_quit_stop_the_loop() {
        let (mut client, _server) = client_with_server().await;
        client
            .handle_event(ClientEvent::Connected { client_id: 1 })
            .await;

        let keep_going = client
            .handle_event(ClientEvent::Disconnected {
                reason: "Server full".to_string(),
            })
            .await;
        assert!(!keep_going);
        assert!(!client.is_connected());

        assert!(!client.handle_command(Command::Quit).await);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_the_loop_running() {
        let (mut client, server) = client_with_server().await;

        // Too large to encode into one datagram
        let keep_going = client
            .handle_command(Command::Set {
                player: "bob".to_string(),
                team: "x".repeat(MAX_DATAGRAM_SIZE),
            })
            .await;
        assert!(keep_going);

        // The next request still goes out
        assert!(client.handle_command(Command::Refresh).await);
        assert_eq!(recv_packet(&server).await, Packet::RequestSnapshot);
    }

    #[tokio::test]
    async fn test_connect_carries_operator_token() {
        let (client, server) = client_with_server().await;
        let mut client = client.with_operator_token(Some("letmein".to_string()));

        client.connect().await.unwrap();

        assert_eq!(
            recv_packet(&server).await,
            Packet::Connect {
                client_version: PROTOCOL_VERSION,
                player_name: "alice".to_string(),
                operator_token: Some("letmein".to_string()),
            }
        );
    }
}
