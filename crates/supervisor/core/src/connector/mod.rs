//! Access to the chain nodes the supervisor follows.

mod error;
pub use error::ClientError;

mod traits;
pub use traits::{ChainClient, ChainConnector};

mod client;
pub use client::{CHAIN_ID_TIMEOUT, RpcChainClient, RpcConnector};
