//! # Authority Library
//!
//! This library provides the authority side of the platformer's state
//! replication protocol. Clients are authoritative over their own position;
//! the authority collects what they report, and periodically broadcasts one
//! consolidated snapshot of the whole world to everyone.
//!
//! ## Core Responsibilities
//!
//! ### Session Tracking
//! Keeps the most recent position reported by every connected client in the
//! session registry. The first message under a new name creates a session,
//! later ones overwrite it, and a message flagged inactive removes it and
//! queues a disconnect event for the next snapshot.
//!
//! ### Snapshot Broadcasting
//! On a fixed tick the authority advances its scripted level objects and
//! serializes objects, sessions and pending events into a single text payload
//! that is fanned out to every subscriber. Events ride in exactly one
//! snapshot and are then discarded.
//!
//! ## Architecture Design
//!
//! ### Independent Loops
//! The reply loop and the broadcast loop run as separate tasks and only meet
//! at the shared registry (`RwLock`) and the pending-event queue (`Mutex`).
//! Snapshots are taken under a single read guard and events are drained
//! under a single lock, so neither loop ever observes a half-applied update.
//!
//! ### UDP-Based Communication
//! Both channels are plain UDP endpoints at fixed addresses. One datagram is
//! one message; snapshots are newline-joined records inside one datagram.
//!
//! ## Module Organization
//!
//! - `registry`: session registry (upsert, removal, snapshot, expiry)
//! - `events`: pending-event queue drained once per tick
//! - `reply`: request/reply channel, one request then one acknowledgment
//! - `broadcast`: subscriber bookkeeping and the snapshot tick loop
//! - `world`: level objects and their scripted motion
//! - `network`: binds both endpoints and runs the loops together
//! - `config`: runtime settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::AuthorityConfig;
//! use server::network::Authority;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority = Authority::bind(AuthorityConfig::default()).await?;
//!     authority.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Security Considerations
//!
//! The authority trusts every position a client reports. There is no
//! movement validation, authentication or rate limiting.

pub mod broadcast;
pub mod config;
pub mod events;
pub mod network;
pub mod registry;
pub mod reply;
pub mod world;
