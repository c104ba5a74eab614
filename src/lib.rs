//! Client side of the BOINC GUI RPC protocol.
//!
//! [`RpcClient`] owns the connection to a core client and exposes one method
//! per request; the typed replies live in [`types`].

pub mod client;
pub mod config;
pub mod ops;
pub mod rpc;
pub mod types;

#[cfg(test)]
mod test_support;

pub use boincrpc_proto::{Result, RpcError, GUI_RPC_FILE, GUI_RPC_PORT};
pub use client::RpcClient;
pub use config::Config;
pub use rpc::Rpc;
