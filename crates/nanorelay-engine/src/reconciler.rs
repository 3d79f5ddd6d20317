//! Reconciler (`waitReceive`, §4.7): settles a single payment onto its
//! ephemeral receive account, refunding any excess to the latest payer.

use std::time::Duration;

use nanorelay_chain::{build_send, find_last_receive_source, ChainAdapter, ConfirmationOrError};
use nanorelay_core::{Address, Amount, BlockHash, BlockSubtype, PaymentError};
use nanorelay_crypto::KeyPair;

pub async fn wait_receive(
    adapter: &dyn ChainAdapter,
    keypair: &KeyPair,
    merchant: &Address,
    amount: Amount,
    deadline: Duration,
) -> Result<BlockHash, PaymentError> {
    // Step 1: absorb anything already sitting on the account as pending.
    adapter.receive_pendings(keypair).await?;

    // Step 2: maybe the account already carries enough balance to settle now.
    match adapter.account_info(&keypair.account).await? {
        Some(info) if info.balance >= amount => {
            return settle(adapter, keypair, merchant, amount, info.frontier, info.balance).await;
        }
        Some(_) | None => {}
    }

    // Step 4: wait on the confirmation feed until the deadline.
    let (sub_id, mut rx) = adapter.subscribe(&keypair.account).await;
    let result = tokio::time::timeout(deadline, async {
        loop {
            let Some(event) = rx.recv().await else {
                return Err(PaymentError::upstream("confirmation channel closed"));
            };
            match event {
                ConfirmationOrError::Error(msg) => return Err(PaymentError::upstream(msg)),
                ConfirmationOrError::Confirmation(c) if c.link_as_account == keypair.account => {
                    match adapter.receive_pendings(keypair).await {
                        Ok(()) => {}
                        Err(PaymentError::Conflict(_)) => {} // "Unreceivable": already received
                        Err(e) => return Err(e),
                    }
                }
                ConfirmationOrError::Confirmation(c) if c.account == keypair.account => {
                    if c.balance >= amount {
                        return settle(adapter, keypair, merchant, amount, c.block_hash, c.balance).await;
                    }
                }
                ConfirmationOrError::Confirmation(_) => {}
            }
        }
    })
    .await;

    adapter.disconnect(sub_id).await;

    match result {
        Ok(inner) => inner,
        Err(_) => Err(PaymentError::Timeout),
    }
}

/// Refund any excess over `amount` to the latest payer, then send `amount`
/// to `merchant`, returning the settlement's hash.
async fn settle(
    adapter: &dyn ChainAdapter,
    keypair: &KeyPair,
    merchant: &Address,
    amount: Amount,
    frontier: BlockHash,
    balance: Amount,
) -> Result<BlockHash, PaymentError> {
    let mut previous = frontier;
    let mut balance = balance;
    let excess = balance - amount;

    if excess > 0 {
        if let Some(source) = find_last_receive_source(adapter, &frontier).await? {
            let refund = build_send(keypair, previous, balance, &source, excess);
            previous = adapter.send_block(&keypair.account, refund, BlockSubtype::Send, false).await?;
            balance -= excess;
        }
    }

    let settlement = build_send(keypair, previous, balance, merchant, amount);
    adapter.send_block(&keypair.account, settlement, BlockSubtype::Send, true).await
}
