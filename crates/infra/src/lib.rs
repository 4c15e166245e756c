//! Command interface strategies: direct, remote and lazy.
//!
//! - [`direct`]: evaluates calls against a live object tree in this process
//! - [`remote`]: forwards calls to another process and serves them there
//! - [`lazy`]: records calls and replays them later
//! - [`config`]: socket and timeout settings

pub mod config;
pub mod direct;
pub mod lazy;
pub mod remote;


pub use config::{RemoteConfig, ServerConfig};
pub use direct::DirectCommandInterface;
pub use lazy::{DeferredCall, FlushError, FlushFailure, FlushPolicy, FlushReport, LazyCommandInterface};
pub use remote::{
    ChannelEndpoint, ChannelTransport, CommandServer, RemoteCommandInterface, ServerHandle,
    Transport, TransportError, UnixSocketTransport, channel_pair,
};
