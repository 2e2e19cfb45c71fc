//! Datagram source implementations

pub mod channel;
pub mod udp;

pub use channel::{ChannelSource, DatagramSender};
pub use udp::UdpSource;
