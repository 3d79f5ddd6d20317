//! A small in-memory stand-in for a live node, enough to drive the Lifecycle
//! Controller through the scenarios in §8 without network I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use nanorelay_chain::{ChainAdapter, ConfirmationOrError};
use nanorelay_core::{
    Address, AccountInfo, Amount, BlockHash, BlockInfo, BlockSubtype, PaymentError, StateBlock,
};
use nanorelay_crypto::{hash::blake2b_256, KeyPair};

struct AccountState {
    frontier: BlockHash,
    balance: Amount,
    block_count: u64,
    blocks: Vec<BlockInfo>,
    hashes: Vec<BlockHash>,
    sent: HashMap<Address, Amount>,
}

impl AccountState {
    fn new() -> Self {
        Self {
            frontier: BlockHash::from_bytes([0u8; 32]),
            balance: 0,
            block_count: 0,
            blocks: Vec::new(),
            hashes: Vec::new(),
            sent: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct Ledger {
    accounts: HashMap<Address, AccountState>,
    external_sends: HashMap<BlockHash, BlockInfo>,
    pending: HashMap<Address, Vec<BlockHash>>,
    next_hash: u64,
}

impl Ledger {
    fn fresh_hash(&mut self) -> BlockHash {
        self.next_hash += 1;
        BlockHash::from_bytes(blake2b_256(&self.next_hash.to_be_bytes()))
    }
}

/// Shared handle; cheap to clone, all state lives behind the inner mutex.
pub struct FakeChainAdapter {
    ledger: Mutex<Ledger>,
}

impl FakeChainAdapter {
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Simulate a payer's send landing as pending on `account`.
    pub fn seed_pending(&self, account: &Address, amount: Amount, payer: &Address) {
        let mut ledger = self.ledger.lock().unwrap();
        let hash = ledger.fresh_hash();
        ledger.external_sends.insert(
            hash,
            BlockInfo {
                subtype: BlockSubtype::Send,
                amount,
                block_account: payer.clone(),
                link: *account.as_bytes(),
                previous: BlockHash::from_bytes([0u8; 32]),
            },
        );
        ledger.pending.entry(account.clone()).or_default().push(hash);
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .get(account)
            .map(|a| a.balance)
            .unwrap_or(0)
    }

    pub fn sent_to(&self, from: &Address, to: &Address) -> Amount {
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .get(from)
            .and_then(|a| a.sent.get(to).copied())
            .unwrap_or(0)
    }

    /// Recover the derivation index used for `account`, for tests that need
    /// to build a `KeyPair` directly against the fake (the real chain never
    /// needs this: only the Lifecycle Controller derives keypairs).
    pub fn index_hint(&self, account: &Address) -> u32 {
        (0..64)
            .find(|i| &KeyPair::derive(&[42u8; 32], *i).account == account)
            .expect("account not derivable from the test seed within the search window")
    }

    /// Drive `receive_pendings` directly, bypassing the Lifecycle Controller,
    /// for tests that want to model partial settlement before a cancel.
    pub async fn receive_all(&self, keypair: &KeyPair) {
        ChainAdapter::receive_pendings(self, keypair).await.unwrap();
    }

    fn push_send(ledger: &mut Ledger, account: &Address, link_account: &Address, amount: Amount) -> BlockHash {
        let hash = ledger.fresh_hash();
        let state = ledger.accounts.entry(account.clone()).or_insert_with(AccountState::new);
        let previous = state.frontier;
        state.balance -= amount;
        state.block_count += 1;
        state.frontier = hash;
        state.hashes.push(hash);
        state.blocks.push(BlockInfo {
            subtype: BlockSubtype::Send,
            amount,
            block_account: account.clone(),
            link: *link_account.as_bytes(),
            previous,
        });
        *state.sent.entry(link_account.clone()).or_insert(0) += amount;
        hash
    }
}

#[async_trait]
impl ChainAdapter for FakeChainAdapter {
    async fn account_info(&self, account: &Address) -> Result<Option<AccountInfo>, PaymentError> {
        let ledger = self.ledger.lock().unwrap();
        Ok(ledger.accounts.get(account).map(|a| AccountInfo {
            frontier: a.frontier,
            balance: a.balance,
            block_count: a.block_count,
            confirmation_height: a.block_count,
        }))
    }

    async fn block_info(&self, hash: &BlockHash) -> Result<BlockInfo, PaymentError> {
        let ledger = self.ledger.lock().unwrap();
        if let Some(info) = ledger.external_sends.get(hash) {
            return Ok(info.clone());
        }
        for account in ledger.accounts.values() {
            if let Some(pos) = account.hashes.iter().position(|h| h == hash) {
                return Ok(account.blocks[pos].clone());
            }
        }
        Err(PaymentError::upstream("block not found in fake ledger"))
    }

    async fn validate_block(
        &self,
        block: &StateBlock,
        expected_merchant: &Address,
        expected_amount: Amount,
    ) -> Result<BlockHash, PaymentError> {
        if !block.is_state() {
            return Err(PaymentError::validation("block is not state-typed"));
        }
        if Address::from_bytes(block.link) != *expected_merchant {
            return Err(PaymentError::validation("block link does not match merchant"));
        }
        let info = self
            .account_info(&block.account)
            .await?
            .ok_or_else(|| PaymentError::validation("account has no on-chain history"))?;
        if info.frontier != block.previous {
            return Err(PaymentError::validation("stale previous"));
        }
        if block.balance >= info.balance {
            return Err(PaymentError::validation("block does not decrease balance"));
        }
        if info.balance - block.balance != expected_amount {
            return Err(PaymentError::validation("amount mismatch"));
        }
        if !nanorelay_crypto::verify_signature(&block.account, &block.signing_bytes(), &block.signature) {
            return Err(PaymentError::validation("bad signature"));
        }
        Ok(nanorelay_crypto::hash::block_hash(&block.signing_bytes()))
    }

    async fn send_block(
        &self,
        account: &Address,
        block: StateBlock,
        _subtype: BlockSubtype,
        _wait_for_confirmation: bool,
    ) -> Result<BlockHash, PaymentError> {
        let mut ledger = self.ledger.lock().unwrap();
        let prior_balance = ledger
            .accounts
            .get(account)
            .map(|a| a.balance)
            .unwrap_or(0)
            .max(block.balance);
        let amount = prior_balance - block.balance;
        let link_account = Address::from_bytes(block.link);
        Ok(Self::push_send(&mut ledger, account, &link_account, amount))
    }

    async fn receive_pendings(&self, keypair: &KeyPair) -> Result<(), PaymentError> {
        let mut ledger = self.ledger.lock().unwrap();
        let hashes = ledger.pending.remove(&keypair.account).unwrap_or_default();
        for hash in hashes {
            let Some(source) = ledger.external_sends.get(&hash).cloned() else {
                continue;
            };
            let new_hash = ledger.fresh_hash();
            let state = ledger
                .accounts
                .entry(keypair.account.clone())
                .or_insert_with(AccountState::new);
            state.balance += source.amount;
            state.block_count += 1;
            let previous = state.frontier;
            state.frontier = new_hash;
            state.hashes.push(new_hash);
            state.blocks.push(BlockInfo {
                subtype: BlockSubtype::Receive,
                amount: source.amount,
                block_account: keypair.account.clone(),
                link: *hash.as_bytes(),
                previous,
            });
        }
        Ok(())
    }

    async fn has_pending(&self, account: &Address) -> Result<bool, PaymentError> {
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .pending
            .get(account)
            .map(|v| !v.is_empty())
            .unwrap_or(false))
    }

    async fn subscribe(&self, _account: &Address) -> (u64, mpsc::Receiver<ConfirmationOrError>) {
        // The fake settles synchronously via the account_info fast path before
        // the reconciler ever needs to read from this channel.
        let (_tx, rx) = mpsc::channel(1);
        (0, rx)
    }

    async fn disconnect(&self, _id: u64) {}
}
