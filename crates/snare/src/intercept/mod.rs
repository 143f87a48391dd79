//! The interception pipeline: accept loop, per-request orchestration,
//! response synthesis, and upstream forwarding.

mod forwarder;
mod handler;
mod server;
mod synth;
mod target;

pub use forwarder::Forwarder;
pub use handler::{handle_request, Interceptor};
pub use server::serve;
pub use synth::render;
pub use target::ProxyTarget;
