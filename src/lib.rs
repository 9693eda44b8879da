pub mod backend;
pub mod cli;
pub mod complete;
pub mod connection;
pub mod core;
pub mod logging;
pub mod profile;
pub mod resolve;
pub mod runtime;
pub mod session;
pub mod transport;
pub mod ui;

pub use backend::Backend;
pub use cli::Cli;
pub use connection::{
  ConnectionError, ConnectionSettings, ConnectionState, Connector,
  RconConnection, Target,
};
pub use crate::core::run;
pub use profile::{Profile, ProfileError, ProfileStore, ValidationResult};
pub use resolve::{ResolveError, resolve_ipv4};
pub use runtime::Runtime;
pub use session::{History, Shell};
