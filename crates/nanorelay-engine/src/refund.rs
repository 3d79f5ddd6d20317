//! Refund path (§4.9): return an ephemeral account's balance to the accounts
//! that funded it, walking the chain backwards from the frontier.

use nanorelay_chain::{build_send, ChainAdapter};
use nanorelay_core::{BlockHash, BlockSubtype, PaymentError};
use nanorelay_crypto::KeyPair;

pub async fn refund(adapter: &dyn ChainAdapter, keypair: &KeyPair) -> Result<(), PaymentError> {
    let Some(info) = adapter.account_info(&keypair.account).await? else {
        return Ok(());
    };

    let zero = BlockHash::from_bytes([0u8; 32]);
    let mut running = info.balance;
    let mut previous = info.frontier;
    let mut balance = info.balance;
    let mut cursor = info.frontier;

    while running > 0 {
        let blk = adapter.block_info(&cursor).await?;

        if blk.subtype == BlockSubtype::Receive {
            let source = adapter.block_info(&BlockHash::from_bytes(blk.link)).await?;
            let refund_amount = running.min(source.amount);

            let send = build_send(keypair, previous, balance, &source.block_account, refund_amount);
            previous = adapter.send_block(&keypair.account, send, BlockSubtype::Send, false).await?;
            balance -= refund_amount;
            running -= refund_amount;
        }

        if blk.previous == zero {
            break;
        }
        cursor = blk.previous;
    }

    Ok(())
}
