//! Everything this server needs from the node it talks to: RPC calls, the
//! WebSocket confirmation feed, block validation/construction, and the
//! `ChainAdapter` boundary the engine programs against (§4.4–§4.7).

pub mod adapter;
pub mod block;
pub mod rpc;
pub mod ws_mux;

pub use adapter::{ChainAdapter, NodeChainAdapter};
pub use block::{build_send, find_last_receive_source};
pub use rpc::RpcClient;
pub use ws_mux::{ConfirmationOrError, WsMux};
