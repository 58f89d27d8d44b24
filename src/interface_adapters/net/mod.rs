// Network adapters: player sockets in `client`, match provisioning in `internal`.

pub mod client;
pub mod internal;

pub use client::{spawn_match_serializer, ws_handler};
pub use internal::create_match_handler;
