//! Wire clients for the Source RCON protocol.
//!
//! Both clients speak the same protocol to the same servers. They differ in
//! which settings are fixed when a client is built: [`ChannelClient`] fixes
//! its I/O timeout, [`DispatchClient`] fixes multi-packet reassembly. The
//! connection layer owns lifecycle decisions; these clients only know how to
//! talk to a server once a socket is open.

pub mod channel;
pub mod dispatch;
pub mod source;

pub use channel::ChannelClient;
pub use dispatch::DispatchClient;
