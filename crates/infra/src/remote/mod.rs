//! Cross-process command execution.
//!
//! - [`RemoteCommandInterface`]: the caller side, generic over a [`Transport`]
//! - [`CommandServer`]: the serving side, wrapping a local command interface
//! - transports: Unix domain sockets and in-process channels (tests/dev)
//!
//! Wire format: length-prefixed JSON frames carrying the envelopes defined in
//! `cmdgraph-interface` (see [`codec`]).

pub mod channel;
pub mod client;
pub mod codec;
pub mod server;
pub mod transport;
pub mod unix;

pub use channel::{ChannelEndpoint, ChannelTransport, channel_pair};
pub use client::RemoteCommandInterface;
pub use server::{CommandServer, ServerHandle};
pub use transport::{Transport, TransportError};
pub use unix::UnixSocketTransport;
