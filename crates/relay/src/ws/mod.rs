// WebSocket boundary adapter: turns upgraded sockets into room connections.

mod handler;
mod protocol;

pub use handler::router;
