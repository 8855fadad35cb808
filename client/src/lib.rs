//! # Client Library
//!
//! This library provides the client side of the platformer's state
//! replication protocol. Each client simulates its own player, reports that
//! player to the authority every frame, and keeps read-only mirrors of
//! everything else in sync with the snapshots the authority broadcasts.
//!
//! ## Architecture Overview
//!
//! ### Local Authority Over Self
//! The local player is never moved by incoming data. Snapshot records that
//! carry the client's own name are dropped before they reach the mirrors.
//!
//! ### Mirror Reconciliation
//! Level objects are created from the shared level description at startup;
//! snapshots only correct them with relative moves. Remote players are
//! created on their first active record and removed when a disconnect event
//! names them, or when no snapshot has mentioned them for too long.
//!
//! ### Background Receive
//! A subscriber task receives snapshot datagrams while the frame loop runs
//! and hands each payload over whole through an inbox. The frame loop drains
//! that inbox once per frame, so a payload is never applied halfway.
//!
//! ## Module Organization
//!
//! - `mirror`: the local player, object and player mirrors, `ClientWorld`
//! - `reconcile`: applying snapshot payloads to a `ClientWorld`
//! - `collision`: explicit collider registry used for overlap queries
//! - `network`: reply-channel requester and broadcast subscriber
//! - `bot`: random walk driving the headless binary
//! - `config`: runtime settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::mirror::{ClientWorld, LocalPlayer};
//! use client::network::{Requester, Subscriber};
//! use shared::{Position, WorldSpec};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let local = LocalPlayer::new("One", Position::new(100.0, 100.0));
//!     let mut world = ClientWorld::new(local, &WorldSpec::default_level());
//!
//!     let requester = Requester::connect("127.0.0.1:5555", Duration::from_millis(500)).await?;
//!     let mut subscriber = Subscriber::spawn("127.0.0.1:5556", Duration::from_secs(1)).await?;
//!
//!     loop {
//!         for payload in subscriber.drain()? {
//!             world.apply_payload(&payload);
//!         }
//!         requester.send_state(&world.local().state()).await?;
//!         tokio::time::sleep(Duration::from_millis(16)).await;
//!     }
//! }
//! ```

pub mod bot;
pub mod collision;
pub mod config;
pub mod mirror;
pub mod network;
pub mod reconcile;
