//! Throughput checks for the roster codec and the membership registry
//!
//! Bounds are generous; these catch pathological regressions, not noise.

use server::registry::MembershipRegistry;
use shared::{
    decode_packet, encode_packet, roster_from_entries, Packet, PlayerId, Roster, TeamCatalog,
    BLUE_TEAM, MAX_DATAGRAM_SIZE, MAX_ROSTER_ENTRIES, MAX_NAME_LEN, RED_TEAM,
};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn full_roster() -> Roster {
    (0..MAX_ROSTER_ENTRIES)
        .map(|i| {
            let team = if i % 2 == 0 { RED_TEAM } else { BLUE_TEAM };
            (format!("player_{:0>24}", i), team.to_string())
        })
        .collect()
}

/// The largest roster the server will ever send still fits in one datagram
#[test]
fn largest_roster_fits_in_a_datagram() {
    let roster: Roster = (0..MAX_ROSTER_ENTRIES)
        .map(|i| {
            let name = format!("{:0>width$}", i, width = MAX_NAME_LEN);
            (name, "a".repeat(shared::MAX_TEAM_ID_LEN))
        })
        .collect();

    let data = encode_packet(&Packet::roster(&roster)).unwrap();
    assert!(data.len() <= MAX_DATAGRAM_SIZE, "{} bytes", data.len());
}

/// Benchmarks roster encode and decode
#[test]
fn benchmark_roster_serialization() {
    let packet = Packet::roster(&full_roster());

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let data = encode_packet(&packet).unwrap();
        match decode_packet(&data).unwrap() {
            Packet::RosterSnapshot { entries } => {
                assert_eq!(roster_from_entries(entries).unwrap().len(), MAX_ROSTER_ENTRIES);
            }
            other => panic!("Unexpected packet: {:?}", other),
        }
    }

    let duration = start.elapsed();
    println!(
        "Roster serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks rejection of oversized roster counts
#[test]
fn benchmark_malformed_roster_rejection() {
    let mut data = encode_packet(&Packet::roster(&full_roster())).unwrap();
    data[4..12].copy_from_slice(&(u32::MAX as u64).to_le_bytes());

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        assert!(decode_packet(&data).is_err());
    }

    let duration = start.elapsed();
    println!("Malformed roster rejection: {} iterations in {:?}", iterations, duration);

    assert!(duration.as_millis() < 5000);
}

/// Stress tests the registry from several threads at once
#[test]
fn stress_test_concurrent_assignments() {
    let registry = Arc::new(MembershipRegistry::new(Arc::new(TeamCatalog::defaults())));
    let threads = 8;
    let per_thread = 10_000u32;

    let start = Instant::now();

    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let player = PlayerId(t * per_thread + i);
                    let team = if i % 2 == 0 { RED_TEAM } else { BLUE_TEAM };
                    registry.assign(player, team).unwrap();
                    assert_eq!(registry.get(player).as_deref(), Some(team));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Concurrent assignments: {} in {:?}",
        threads * per_thread,
        duration
    );

    assert_eq!(registry.len(), (threads * per_thread) as usize);
    assert!(duration.as_millis() < 5000);
}
