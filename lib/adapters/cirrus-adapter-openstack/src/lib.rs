//! OpenStack adapters: Keystone sessions, inventory REST calls and the Gnocchi client.

pub mod gnocchi;
pub mod http;
pub mod inventory;
pub mod keystone;
mod wire;

pub use gnocchi::{GnocchiClient, GnocchiConnector, resolve_endpoint};
pub use http::build_client;
pub use inventory::OpenStackInventory;
pub use keystone::KeystoneAuthenticator;

#[cfg(test)]
mod inventory_test;
#[cfg(test)]
mod test_server;
#[cfg(test)]
mod wire_test;
