//! Local daemon holding the live game, and the client side of its socket.
//!
//! Protocol: one JSON request line per connection, one JSON reply line.
//! Replies are `{"ok": true, "data": ...}` or `{"ok": false, "error": "..."}`.

mod dispatch;
mod runtime;
mod server;

pub use server::{client_request, run_daemon};
