//! Lifecycle Controller (§4.8): the five payment operations and the
//! per-payment state machine (`Created → Allocated → {Settled, Cancelled,
//! HandedOff}`) bracketing every mutation with the Key-Lock Table.

use std::sync::Arc;
use std::time::Duration;

use nanorelay_chain::ChainAdapter;
use nanorelay_core::{
    unix_now, Address, BlockHash, BlockSubtype, PaymentError, PaymentId, StateBlock,
    DEFAULT_WAIT_TIMEOUT_SECS,
};
use nanorelay_crypto::KeyPair;
use nanorelay_store::Store;

use crate::key_lock::KeyLockTable;
use crate::reconciler;
use crate::refund;

pub struct LifecycleController {
    store: Store,
    chain: Arc<dyn ChainAdapter>,
    locks: KeyLockTable,
    seed: [u8; 32],
    callback_url: Option<String>,
    http: reqwest::Client,
}

impl LifecycleController {
    pub fn new(
        store: Store,
        chain: Arc<dyn ChainAdapter>,
        seed: [u8; 32],
        callback_url: Option<String>,
    ) -> Self {
        Self {
            store,
            chain,
            locks: KeyLockTable::new(),
            seed,
            callback_url: callback_url.filter(|s| !s.is_empty()),
            http: reqwest::Client::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn locks(&self) -> &KeyLockTable {
        &self.locks
    }

    fn derive(&self, index: u32) -> KeyPair {
        KeyPair::derive(&self.seed, index)
    }

    async fn is_quiescent(&self, account: &Address) -> Result<bool, PaymentError> {
        if self.chain.has_pending(account).await? {
            return Ok(false);
        }
        match self.chain.account_info(account).await? {
            None => Ok(true),
            Some(info) => Ok(info.is_quiescent(0)),
        }
    }

    /// `newPayment(merchant, amount) → {id, account}` (not bracketed by the key-lock).
    ///
    /// `amount_display` is a decimal string in display units (§3.1); this is
    /// the one place the display/raw conversion happens.
    pub async fn new_payment(
        &self,
        merchant: &str,
        amount_display: &str,
    ) -> Result<(PaymentId, Address), PaymentError> {
        let merchant = Address::from_display(merchant)?;
        let amount = nanorelay_core::display_to_raw(amount_display)?;
        if amount == 0 {
            return Err(PaymentError::validation("amount must be greater than zero"));
        }

        let id = self.store.create_payment(&merchant, amount)?;
        let now = unix_now();
        let mut min_index = 0;

        loop {
            let index = self.store.allocate(&id, min_index, now)?;
            let keypair = self.derive(index);
            if self.is_quiescent(&keypair.account).await? {
                return Ok((id, keypair.account));
            }
            self.store.free(&id)?;
            min_index = index;
        }
    }

    /// `waitPayment(id, timeout) → {id, blockHash}`.
    pub async fn wait_payment(
        &self,
        id: &PaymentId,
        timeout: Option<Duration>,
    ) -> Result<BlockHash, PaymentError> {
        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS));

        let (index, merchant, amount) = {
            let _guard = self.locks.lock_async(id.as_str()).await;
            let payment = self.store.get_payment(id)?.ok_or(PaymentError::NotFound)?;
            if let Some(hash) = payment.settled_hash {
                return Ok(hash);
            }
            let index = self
                .store
                .index_of(id)?
                .ok_or_else(|| PaymentError::internal("payment has no allocation"))?;
            (index, payment.merchant_account, payment.requested_amount)
        };

        let keypair = self.derive(index);
        let hash = reconciler::wait_receive(
            self.chain.as_ref(),
            &keypair,
            &merchant,
            amount,
            timeout,
        )
        .await?;

        let _guard = self.locks.lock_async(id.as_str()).await;
        self.store.set_payment_hash(id, &hash)?;
        self.store.free(id)?;
        Ok(hash)
    }

    /// `cancelPayment(id) → ok`.
    pub async fn cancel_payment(&self, id: &PaymentId) -> Result<(), PaymentError> {
        let _guard = self.locks.lock_async(id.as_str()).await;
        let payment = self.store.get_payment(id)?.ok_or(PaymentError::NotFound)?;
        if payment.settled_hash.is_some() {
            return Err(PaymentError::conflict("payment already settled"));
        }

        let index = self
            .store
            .index_of(id)?
            .ok_or_else(|| PaymentError::internal("payment has no allocation"))?;
        let keypair = self.derive(index);
        refund::refund(self.chain.as_ref(), &keypair).await?;

        self.store.delete_payment(id)?;
        self.store.free(id)?;
        Ok(())
    }

    /// `handoffPayment(id, signedBlock) → {id, blockHash}`.
    pub async fn handoff_payment(
        &self,
        id: &PaymentId,
        block: StateBlock,
    ) -> Result<BlockHash, PaymentError> {
        let _guard = self.locks.lock_async(id.as_str()).await;
        let payment = self.store.get_payment(id)?.ok_or(PaymentError::NotFound)?;

        // Check resubmission against the already-persisted hash before asking the
        // chain to re-validate: by the time a payment is settled its frontier has
        // moved past `block.previous`, so a fresh validate_block call would reject
        // even an exact resubmission of the original block (§9, open question ii).
        if let Some(existing) = payment.settled_hash {
            let hash = nanorelay_crypto::hash::block_hash(&block.signing_bytes());
            if existing == hash {
                return Ok(hash);
            }
            return Err(PaymentError::conflict("payment has already been submitted"));
        }

        let hash = self
            .chain
            .validate_block(&block, &payment.merchant_account, payment.requested_amount)
            .await?;

        self.store.set_payment_hash(id, &hash)?;
        self.store.free(id)?;

        let sender = block.account.clone();
        self.chain.send_block(&sender, block, BlockSubtype::Send, false).await?;

        self.notify_callback(id, &hash).await;
        Ok(hash)
    }

    /// `statusPayment(id) → {id, blockHash?}` — a pure read.
    pub fn status_payment(&self, id: &PaymentId) -> Result<Option<BlockHash>, PaymentError> {
        let payment = self.store.get_payment(id)?.ok_or(PaymentError::NotFound)?;
        Ok(payment.settled_hash)
    }

    async fn notify_callback(&self, id: &PaymentId, hash: &BlockHash) {
        let Some(url) = &self.callback_url else {
            return;
        };
        let body = serde_json::json!({"id": id.as_str(), "block_hash": hash.to_hex()});
        if let Err(e) = self.http.post(url).json(&body).send().await {
            tracing::warn!(payment_id = %id, error = %e, "callback delivery failed");
        }
    }

    /// One scavenger pass over a single stale allocation (§4.10): re-read
    /// under `tryLock`, skip if terminal or contended, else refund + delete + free.
    pub(crate) async fn scavenge_one(&self, id: &PaymentId) {
        let Some(_guard) = self.locks.try_lock(id.as_str()) else {
            return;
        };

        let payment = match self.store.get_payment(id) {
            Ok(Some(p)) => p,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(payment_id = %id, error = %e, "scavenger: lookup failed");
                return;
            }
        };
        if payment.settled_hash.is_some() {
            return;
        }

        let index = match self.store.index_of(id) {
            Ok(Some(i)) => i,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(payment_id = %id, error = %e, "scavenger: index lookup failed");
                return;
            }
        };
        let keypair = self.derive(index);

        if let Err(e) = refund::refund(self.chain.as_ref(), &keypair).await {
            tracing::warn!(payment_id = %id, error = %e, "scavenger: refund failed");
            return;
        }
        if let Err(e) = self.store.delete_payment(id) {
            tracing::warn!(payment_id = %id, error = %e, "scavenger: delete failed");
            return;
        }
        if let Err(e) = self.store.free(id) {
            tracing::warn!(payment_id = %id, error = %e, "scavenger: free failed");
        }
    }
}
