//! HTTP surface over the camera arbiter and the upload session registry

mod handlers;
mod server;

pub use handlers::ModeQuery;
pub use server::{ServerState, StreamServer, StreamServerBuilder};
