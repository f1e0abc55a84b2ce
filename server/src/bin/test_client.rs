//! Scripted bot that connects, asks for random team changes and prints
//! every roster it receives. Run it with an operator name to see changes
//! go through, or any other name to see them refused. Operators also need
//! the server's operator token as the third argument.

use rand::seq::SliceRandom;
use shared::{
    decode_packet, encode_packet, roster_from_entries, Packet, TeamEntry, MAX_DATAGRAM_SIZE,
    PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn send(
    socket: &UdpSocket,
    packet: &Packet,
    server_addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = encode_packet(packet)?;
    socket.send_to(&data, server_addr).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let server_addr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:8080".to_string())
        .parse::<SocketAddr>()?;
    let name = args.next().unwrap_or_else(|| "admin".to_string());
    let operator_token = args.next();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    println!("Connecting to {} as {}", server_addr, name);
    send(
        &socket,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
            player_name: name.clone(),
            operator_token,
        },
        server_addr,
    )
    .await?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut teams: Vec<TeamEntry> = Vec::new();
    let mut rng = rand::thread_rng();

    for round in 0..10 {
        // Drain everything the server sent since the last round
        while let Ok(Ok((len, _))) =
            timeout(Duration::from_millis(500), socket.recv_from(&mut buf)).await
        {
            match decode_packet(&buf[..len]) {
                Ok(Packet::Connected { client_id }) => {
                    println!("Connected with client ID: {}", client_id)
                }
                Ok(Packet::Catalog { teams: entries }) => {
                    println!("Catalog: {} teams", entries.len());
                    teams = entries;
                }
                Ok(Packet::RosterSnapshot { entries }) => match roster_from_entries(entries) {
                    Ok(roster) => {
                        println!("Roster ({} players):", roster.len());
                        for (player, team) in roster {
                            println!("  {} -> {}", player, team);
                        }
                    }
                    Err(e) => println!("Bad roster: {}", e),
                },
                Ok(Packet::Notice { level, text }) => println!("[{:?}] {}", level, text),
                Ok(Packet::Disconnected { reason }) => {
                    println!("Disconnected: {}", reason);
                    return Ok(());
                }
                Ok(other) => println!("Unexpected packet: {:?}", other),
                Err(e) => println!("Failed to decode packet: {}", e),
            }
        }

        let Some(team) = teams.choose(&mut rng) else {
            println!("No catalog yet, requesting snapshot");
            send(&socket, &Packet::RequestSnapshot, server_addr).await?;
            continue;
        };

        println!("Round {}: moving {} to {}", round, name, team.team_id);
        send(
            &socket,
            &Packet::TeamChangeRequest {
                target_name: name.clone(),
                team_id: team.team_id.clone(),
            },
            server_addr,
        )
        .await?;
        send(&socket, &Packet::Heartbeat, server_addr).await?;
    }

    send(&socket, &Packet::Disconnect, server_addr).await?;
    println!("Test completed");

    Ok(())
}
