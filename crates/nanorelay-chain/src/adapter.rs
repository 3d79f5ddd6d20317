//! Chain Adapter (§4.4): a trait boundary over the node's RPC/WS surface so
//! the engine crate can be tested against a fake without a live node.

use async_trait::async_trait;
use nanorelay_core::{Address, AccountInfo, BlockHash, BlockInfo, BlockSubtype, PaymentError, StateBlock};
use nanorelay_crypto::KeyPair;

use crate::block;
use crate::rpc::RpcClient;
use crate::ws_mux::{ConfirmationOrError, WsMux};

#[async_trait]
pub trait ChainAdapter: Send + Sync {
    async fn account_info(&self, account: &Address) -> Result<Option<AccountInfo>, PaymentError>;
    async fn block_info(&self, hash: &BlockHash) -> Result<BlockInfo, PaymentError>;

    async fn validate_block(
        &self,
        block: &StateBlock,
        expected_merchant: &Address,
        expected_amount: nanorelay_core::Amount,
    ) -> Result<BlockHash, PaymentError>;

    async fn send_block(
        &self,
        account: &Address,
        block: StateBlock,
        subtype: BlockSubtype,
        wait_for_confirmation: bool,
    ) -> Result<BlockHash, PaymentError>;

    /// Receive every currently-pending block on `keypair`'s account (§4.7 step 1).
    async fn receive_pendings(&self, keypair: &KeyPair) -> Result<(), PaymentError>;

    /// Whether `account` has any receivable value not yet absorbed into its balance.
    async fn has_pending(&self, account: &Address) -> Result<bool, PaymentError>;

    /// Each call returns a fresh subscription id; a second subscribe on an
    /// account already subscribed does not evict the first (§4.5).
    async fn subscribe(&self, account: &Address) -> (u64, tokio::sync::mpsc::Receiver<ConfirmationOrError>);
    async fn disconnect(&self, id: u64);
}

/// Default adapter backed by a live node's RPC and WebSocket endpoints.
#[derive(Clone)]
pub struct NodeChainAdapter {
    rpc: RpcClient,
    mux: WsMux,
}

impl NodeChainAdapter {
    pub fn new(rpc_url: impl Into<String>, pow_url: Option<String>, ws_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url, pow_url),
            mux: WsMux::new(ws_url),
        }
    }
}

#[async_trait]
impl ChainAdapter for NodeChainAdapter {
    async fn account_info(&self, account: &Address) -> Result<Option<AccountInfo>, PaymentError> {
        self.rpc.account_info(account).await
    }

    async fn block_info(&self, hash: &BlockHash) -> Result<BlockInfo, PaymentError> {
        self.rpc.block_info(hash).await
    }

    async fn validate_block(
        &self,
        blk: &StateBlock,
        expected_merchant: &Address,
        expected_amount: nanorelay_core::Amount,
    ) -> Result<BlockHash, PaymentError> {
        block::validate_block(&self.rpc, blk, expected_merchant, expected_amount).await
    }

    async fn send_block(
        &self,
        account: &Address,
        blk: StateBlock,
        subtype: BlockSubtype,
        wait_for_confirmation: bool,
    ) -> Result<BlockHash, PaymentError> {
        block::send_block(&self.rpc, &self.mux, account, blk, subtype, wait_for_confirmation).await
    }

    async fn receive_pendings(&self, keypair: &KeyPair) -> Result<(), PaymentError> {
        let pending = self.rpc.pending(&keypair.account).await?;
        for hash in pending {
            let source = self.rpc.block_info(&hash).await?;
            let current = self.rpc.account_info(&keypair.account).await?;

            let (previous, balance, representative) = match &current {
                Some(info) => (info.frontier, info.balance + source.amount, keypair.account.clone()),
                None => (BlockHash::from_bytes([0u8; 32]), source.amount, keypair.account.clone()),
            };

            let mut blk = StateBlock {
                block_type: "state".to_string(),
                account: keypair.account.clone(),
                previous,
                representative,
                balance,
                link: *hash.as_bytes(),
                signature: [0u8; 64],
                work: String::new(),
            };
            blk.signature = keypair.sign(&blk.signing_bytes());

            self.send_block(&keypair.account, blk, BlockSubtype::Receive, false).await?;
        }
        Ok(())
    }

    async fn has_pending(&self, account: &Address) -> Result<bool, PaymentError> {
        Ok(!self.rpc.pending(account).await?.is_empty())
    }

    async fn subscribe(&self, account: &Address) -> (u64, tokio::sync::mpsc::Receiver<ConfirmationOrError>) {
        self.mux.subscribe(account).await
    }

    async fn disconnect(&self, id: u64) {
        self.mux.disconnect(id).await
    }
}
