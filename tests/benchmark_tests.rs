//! Performance benchmarks for the per-tick hot paths

use client::collision::{ColliderId, ColliderRegistry};
use client::mirror::{ClientWorld, LocalPlayer};
use server::registry::SessionRegistry;
use shared::{decode_payload, Aabb, Position, SnapshotWriter, WorldSpec, MAX_DATAGRAM};
use std::time::Instant;

fn snapshot_with_players(count: usize) -> String {
    let mut writer = SnapshotWriter::new();
    for object in &WorldSpec::default_level().objects {
        writer.object(&object.name, object.x, object.y);
    }
    for i in 0..count {
        writer.player(&format!("player{}", i), true, i as f64 * 7.5, 300.0);
    }
    writer.finish()
}

/// Benchmarks building a snapshot from a populated registry
#[test]
fn benchmark_snapshot_encoding() {
    let mut registry = SessionRegistry::new();
    for i in 0..100 {
        registry.upsert(&format!("player{}", i), i as f64, 300.0);
    }

    let iterations = 1_000;
    let start = Instant::now();
    let mut payload = String::new();

    for _ in 0..iterations {
        let mut writer = SnapshotWriter::new();
        for session in registry.snapshot() {
            writer.player(
                &session.name,
                session.active,
                session.position.x,
                session.position.y,
            );
        }
        payload = writer.finish();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot encoding (100 players): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // 100 players must fit one datagram
    assert!(payload.len() < MAX_DATAGRAM);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks decoding a full snapshot payload
#[test]
fn benchmark_payload_decoding() {
    let payload = snapshot_with_players(100);

    let iterations = 1_000;
    let start = Instant::now();
    let mut decoded = 0;

    for _ in 0..iterations {
        decoded = decode_payload(&payload).iter().filter(|r| r.is_ok()).count();
    }

    let duration = start.elapsed();
    println!(
        "Payload decoding (104 records): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(decoded, 104);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks applying snapshots to the mirror set
#[test]
fn benchmark_reconciliation() {
    let payload = snapshot_with_players(100);
    let mut world = ClientWorld::new(
        LocalPlayer::new("local", Position::new(0.0, 0.0)),
        &WorldSpec::default_level(),
    );

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        world.apply_payload(&payload);
    }

    let duration = start.elapsed();
    println!(
        "Reconciliation (104 records): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(world.players().count(), 100);
    assert!(duration.as_millis() < 3000);
}

/// Benchmarks broad-phase overlap queries
#[test]
fn benchmark_overlap_queries() {
    let mut colliders = ColliderRegistry::new();
    for i in 0..200 {
        colliders.register(
            ColliderId::Player(format!("player{}", i)),
            Aabb::player(Position::new((i % 25) as f64 * 32.0, (i / 25) as f64 * 32.0)),
        );
    }
    let probe = Aabb::player(Position::new(100.0, 100.0));

    let iterations = 10_000;
    let start = Instant::now();
    let mut hits = 0;

    for _ in 0..iterations {
        hits = colliders.overlapping(&probe, None).len();
    }

    let duration = start.elapsed();
    println!(
        "Overlap queries (200 colliders): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(hits > 0);
    assert!(duration.as_millis() < 3000);
}
