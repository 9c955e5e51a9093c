//! Network module.
//!
//! One [`Connection`] per configured server. Each owns its writer task,
//! authorization cache, and NickServ listeners; nothing is shared between
//! networks except the command registry and the account store.

mod connection;
mod outbound;

pub use connection::{Connection, ConnectionSettings};
pub use outbound::Outbound;
