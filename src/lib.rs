// Relay configuration
pub mod config;

// Entity model and state store
pub mod state;

// Wire protocol (inbound decoding, outbound envelopes)
pub mod protocol;

// Connection registry and broadcast fan-out
pub mod registry;

// Single-writer hub and protocol router
pub mod hub;

// Background simulation loop
pub mod simulation;

// HTTP and WebSocket APIs
pub mod api;
