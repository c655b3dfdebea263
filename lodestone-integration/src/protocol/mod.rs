/// Contains a minimal timeout-bounded REST client.
pub mod rest;

/// Contains useful WebSocket type aliases and connection utilities.
pub mod websocket;
