use nanorelay_core::{PaymentError, PaymentId, Timestamp, WalletIndex};

use crate::db::Store;

impl Store {
    /// Assign the lowest free wallet index greater than `min_index` to
    /// `payment_id`, reusing an expired row if one exists before growing the
    /// table (§4.3).
    pub fn allocate(
        &self,
        payment_id: &PaymentId,
        min_index: WalletIndex,
        now: Timestamp,
    ) -> Result<WalletIndex, PaymentError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let free_rowid: Option<i64> = tx
            .query_row(
                "SELECT rowid FROM wallet
                 WHERE rowid > ?1 AND (id = '' OR id IS NULL)
                 ORDER BY rowid LIMIT 1",
                [min_index as i64],
                |row| row.get(0),
            )
            .ok();

        let index = match free_rowid {
            Some(rowid) => {
                tx.execute(
                    "UPDATE wallet SET id = ?1, time = ?2 WHERE rowid = ?3",
                    (payment_id.as_str(), now, rowid),
                )?;
                rowid as WalletIndex
            }
            None => {
                let next: i64 =
                    tx.query_row("SELECT COALESCE(MAX(rowid), 0) + 1 FROM wallet", [], |row| {
                        row.get(0)
                    })?;
                let next = next.max(min_index as i64 + 1);
                tx.execute(
                    "INSERT INTO wallet (rowid, id, time) VALUES (?1, ?2, ?3)",
                    (next, payment_id.as_str(), now),
                )?;
                next as WalletIndex
            }
        };

        tx.commit()?;
        Ok(index)
    }

    /// The wallet index currently assigned to `payment_id`, if any (§4.3).
    pub fn index_of(&self, payment_id: &PaymentId) -> Result<Option<WalletIndex>, PaymentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT rowid FROM wallet WHERE id = ?1")?;
        let mut rows = stmt.query([payment_id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get::<_, i64>(0)? as WalletIndex)),
            None => Ok(None),
        }
    }

    /// Release the row back to the free pool without deleting it, so the
    /// rowid can be reused by a later allocation (§4.3, §4.10).
    pub fn free(&self, payment_id: &PaymentId) -> Result<(), PaymentError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE wallet SET id = '', time = NULL WHERE id = ?1",
            [payment_id.as_str()],
        )?;
        Ok(())
    }

    /// Payment ids still holding an allocation assigned before `cutoff`
    /// (§4.10 — candidates for the scavenger sweep).
    pub fn expired(&self, cutoff: Timestamp) -> Result<Vec<PaymentId>, PaymentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM wallet WHERE id != '' AND id IS NOT NULL AND time < ?1",
        )?;
        let rows = stmt.query_map([cutoff], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(PaymentId(row?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        Store::open(dir.path().join("test.db")).unwrap()
    }

    fn pid(s: &str) -> PaymentId {
        PaymentId(s.to_string())
    }

    #[test]
    fn allocate_then_index_of() {
        let store = temp_store();
        let idx = store.allocate(&pid("p1"), 0, 1000).unwrap();
        assert!(idx >= 1);
        assert_eq!(store.index_of(&pid("p1")).unwrap(), Some(idx));
    }

    #[test]
    fn free_then_reallocated() {
        let store = temp_store();
        let idx = store.allocate(&pid("p1"), 0, 1000).unwrap();
        store.free(&pid("p1")).unwrap();
        assert_eq!(store.index_of(&pid("p1")).unwrap(), None);

        let idx2 = store.allocate(&pid("p2"), 0, 2000).unwrap();
        assert_eq!(idx, idx2, "freed rowid should be reused");
    }

    #[test]
    fn min_index_is_respected() {
        let store = temp_store();
        let idx = store.allocate(&pid("p1"), 5, 1000).unwrap();
        assert!(idx > 5);
    }

    #[test]
    fn expired_lists_stale_allocations() {
        let store = temp_store();
        store.allocate(&pid("old"), 0, 100).unwrap();
        store.allocate(&pid("new"), 0, 9999).unwrap();
        let stale = store.expired(5000).unwrap();
        assert_eq!(stale, vec![pid("old")]);
    }
}
