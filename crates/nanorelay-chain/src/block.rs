//! Block Validator & Sender (§4.6).

use std::time::Duration;

use nanorelay_core::{Address, Amount, BlockHash, BlockSubtype, PaymentError, StateBlock};
use nanorelay_crypto::{keypair::verify_signature, hash::block_hash, KeyPair};

use crate::adapter::ChainAdapter;
use crate::rpc::RpcClient;
use crate::ws_mux::{ConfirmationOrError, WsMux};

const SEND_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Validate `block` as a send of exactly `expected_amount` to `expected_merchant`,
/// returning its computed hash on success.
pub async fn validate_block(
    rpc: &RpcClient,
    block: &StateBlock,
    expected_merchant: &Address,
    expected_amount: Amount,
) -> Result<BlockHash, PaymentError> {
    if !block.is_state() {
        return Err(PaymentError::validation("block is not state-typed"));
    }

    let link_account = Address::from_bytes(block.link);
    if &link_account != expected_merchant {
        return Err(PaymentError::validation("block link does not match merchant"));
    }

    let info = rpc
        .account_info(&block.account)
        .await?
        .ok_or_else(|| PaymentError::validation("account has no on-chain history"))?;

    if info.frontier != block.previous {
        return Err(PaymentError::validation("block.previous is not the current frontier"));
    }
    if block.balance >= info.balance {
        return Err(PaymentError::validation("block does not decrease balance"));
    }

    let sent = info.balance - block.balance;
    if sent != expected_amount {
        return Err(PaymentError::validation("send amount does not match requested amount"));
    }

    if !verify_signature(&block.account, &block.signing_bytes(), &block.signature) {
        return Err(PaymentError::validation("bad block signature"));
    }

    Ok(block_hash(&block.signing_bytes()))
}

/// Attach PoW and submit `block`, optionally waiting for its confirmation
/// on `mux` within a one-minute timeout.
pub async fn send_block(
    rpc: &RpcClient,
    mux: &WsMux,
    account: &Address,
    mut block: StateBlock,
    subtype: BlockSubtype,
    wait_for_confirmation: bool,
) -> Result<BlockHash, PaymentError> {
    let difficulty = rpc.active_difficulty().await?;
    let work = rpc.generate_pow(&block.previous, difficulty).await?;
    block.work = format!("{work:016x}");

    let hash = rpc.process(&block, subtype).await?;

    if !wait_for_confirmation {
        return Ok(hash);
    }

    let (sub_id, mut rx) = mux.subscribe(account).await;
    let result = tokio::time::timeout(SEND_CONFIRMATION_TIMEOUT, async {
        while let Some(event) = rx.recv().await {
            match event {
                ConfirmationOrError::Confirmation(c) if c.block_hash == hash => return Ok(()),
                ConfirmationOrError::Confirmation(_) => continue,
                ConfirmationOrError::Error(msg) => return Err(PaymentError::upstream(msg)),
            }
        }
        Err(PaymentError::upstream("confirmation channel closed"))
    })
    .await;

    mux.disconnect(sub_id).await;

    match result {
        Ok(inner) => inner.map(|_| hash),
        Err(_) => Err(PaymentError::Timeout),
    }
}

/// Build and sign a send block from `keypair`'s account, decreasing its
/// balance from `prior_balance` by `amount` towards `link_account`.
pub fn build_send(
    keypair: &KeyPair,
    previous: BlockHash,
    prior_balance: Amount,
    link_account: &Address,
    amount: Amount,
) -> StateBlock {
    let mut blk = StateBlock {
        block_type: "state".to_string(),
        account: keypair.account.clone(),
        previous,
        representative: keypair.account.clone(),
        balance: prior_balance - amount,
        link: *link_account.as_bytes(),
        signature: [0u8; 64],
        work: String::new(),
    };
    blk.signature = keypair.sign(&blk.signing_bytes());
    blk
}

/// Walk an account's chain backwards from `frontier` to the most recent
/// receive block, returning the account that funded it (§4.7 step 2, §9).
pub async fn find_last_receive_source(
    adapter: &dyn ChainAdapter,
    frontier: &BlockHash,
) -> Result<Option<Address>, PaymentError> {
    let zero = BlockHash::from_bytes([0u8; 32]);
    let mut cursor = *frontier;
    loop {
        let blk = adapter.block_info(&cursor).await?;
        if blk.subtype == BlockSubtype::Receive {
            let source = adapter.block_info(&BlockHash::from_bytes(blk.link)).await?;
            return Ok(Some(source.block_account));
        }
        if blk.previous == zero {
            return Ok(None);
        }
        cursor = blk.previous;
    }
}
