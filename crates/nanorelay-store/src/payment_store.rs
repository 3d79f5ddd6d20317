use nanorelay_core::{Address, Amount, BlockHash, Payment, PaymentError, PaymentId};

use crate::db::Store;

impl Store {
    /// Insert a fresh payment row with an empty hash (§4.2).
    pub fn create_payment(
        &self,
        merchant_account: &Address,
        amount: Amount,
    ) -> Result<PaymentId, PaymentError> {
        let id = PaymentId::generate();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO payments (id, account, amount, block_hash) VALUES (?1, ?2, ?3, NULL)",
            (id.as_str(), merchant_account.to_display(), amount.to_string()),
        )?;
        Ok(id)
    }

    pub fn get_payment(&self, id: &PaymentId) -> Result<Option<Payment>, PaymentError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT account, amount, block_hash FROM payments WHERE id = ?1")?;
        let mut rows = stmt.query([id.as_str()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let account_s: String = row.get(0)?;
        let amount_s: String = row.get(1)?;
        let hash_s: Option<String> = row.get(2)?;

        let merchant_account = Address::from_display(&account_s)?;
        let requested_amount: Amount = amount_s
            .parse()
            .map_err(|_| PaymentError::Internal(format!("corrupt amount for {id}")))?;
        let settled_hash = match hash_s {
            Some(h) if !h.is_empty() => Some(
                BlockHash::from_hex(&h)
                    .map_err(|_| PaymentError::Internal(format!("corrupt hash for {id}")))?,
            ),
            _ => None,
        };

        Ok(Some(Payment {
            id: id.clone(),
            merchant_account,
            requested_amount,
            settled_hash,
        }))
    }

    /// Set `block_hash` once. Idempotent when the same hash is supplied again (§4.2).
    pub fn set_payment_hash(&self, id: &PaymentId, hash: &BlockHash) -> Result<(), PaymentError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE payments SET block_hash = ?1 WHERE id = ?2",
            (hash.to_hex(), id.as_str()),
        )?;
        if changed == 0 {
            return Err(PaymentError::NotFound);
        }
        Ok(())
    }

    pub fn delete_payment(&self, id: &PaymentId) -> Result<(), PaymentError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM payments WHERE id = ?1", [id.as_str()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        Store::open(dir.path().join("test.db")).unwrap()
    }

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = temp_store();
        let id = store.create_payment(&addr(1), 1000).unwrap();
        let payment = store.get_payment(&id).unwrap().unwrap();
        assert_eq!(payment.requested_amount, 1000);
        assert_eq!(payment.merchant_account, addr(1));
        assert!(payment.settled_hash.is_none());
    }

    #[test]
    fn set_hash_then_idempotent_repeat() {
        let store = temp_store();
        let id = store.create_payment(&addr(2), 500).unwrap();
        let hash = BlockHash::from_bytes([9u8; 32]);
        store.set_payment_hash(&id, &hash).unwrap();
        // Setting the same hash again must not error (§8 idempotence).
        store.set_payment_hash(&id, &hash).unwrap();
        let payment = store.get_payment(&id).unwrap().unwrap();
        assert_eq!(payment.settled_hash, Some(hash));
    }

    #[test]
    fn delete_then_not_found() {
        let store = temp_store();
        let id = store.create_payment(&addr(3), 1).unwrap();
        store.delete_payment(&id).unwrap();
        assert!(store.get_payment(&id).unwrap().is_none());
    }
}
