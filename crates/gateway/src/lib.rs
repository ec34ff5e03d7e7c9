//! Realtime gateway: WebSocket transport, room fan-out, and the chat HTTP
//! façade.
//!
//! Lifecycle:
//! 1. Load config, open the message store
//! 2. Resolve the token verifier (no default bypass)
//! 3. Build the hub (connection registry + room multiplexer)
//! 4. Start the HTTP server with the WebSocket upgrade route
//!
//! Durable chat logic lives in `studyhall-chat` and receives the hub as its
//! fan-out seam; nothing here reaches for process globals.

pub mod auth;
pub mod error;
pub mod http;
pub mod hub;
pub mod server;
pub mod state;
pub mod ws;
