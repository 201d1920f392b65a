//! Concrete datagram sources

pub mod udp;

pub use udp::UdpSource;
