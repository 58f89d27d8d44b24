// Interface adapters: wire protocol, network handling and the in-memory platform.

pub mod http;
pub mod net;
pub mod platform;
pub mod protocol;
pub mod state;
pub mod utils;
