//! End-to-end exercises of the Lifecycle Controller against an in-memory
//! fake chain, covering the scenarios named in §8.

mod fake_chain;

use std::sync::Arc;
use std::time::Duration;

use nanorelay_chain::{build_send, ChainAdapter};
use nanorelay_core::{raw_to_display, unix_now, Address};
use nanorelay_crypto::KeyPair;
use nanorelay_store::Store;

use crate::lifecycle::LifecycleController;
use fake_chain::FakeChainAdapter;

fn temp_store() -> Store {
    let dir = tempfile::tempdir().unwrap();
    // Leak the tempdir so the file outlives the test body; fine for a test helper.
    let path = dir.into_path().join("test.db");
    Store::open(path).unwrap()
}

fn merchant(byte: u8) -> Address {
    Address::from_bytes([byte; 32])
}

fn controller(chain: Arc<FakeChainAdapter>) -> LifecycleController {
    LifecycleController::new(temp_store(), chain, [42u8; 32], None)
}

#[tokio::test]
async fn happy_path_wait_settles_exactly_the_requested_amount() {
    let chain = Arc::new(FakeChainAdapter::new());
    let ctl = controller(chain.clone());

    let (id, account) = ctl.new_payment(&merchant(1).to_display(), &raw_to_display(1000)).await.unwrap();
    let payer = Address::from_bytes([9u8; 32]);
    chain.seed_pending(&account, 1000, &payer);

    let hash = ctl.wait_payment(&id, Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(ctl.status_payment(&id).unwrap(), Some(hash));
    assert_eq!(chain.balance_of(&account), 0);
    assert_eq!(chain.sent_to(&account, &merchant(1)), 1000);
}

#[tokio::test]
async fn overpayment_refunds_the_excess_to_the_payer() {
    let chain = Arc::new(FakeChainAdapter::new());
    let ctl = controller(chain.clone());

    let (id, account) = ctl.new_payment(&merchant(2).to_display(), &raw_to_display(1000)).await.unwrap();
    let payer = Address::from_bytes([11u8; 32]);
    chain.seed_pending(&account, 1500, &payer);

    ctl.wait_payment(&id, Some(Duration::from_secs(5))).await.unwrap();

    assert_eq!(chain.balance_of(&account), 0);
    assert_eq!(chain.sent_to(&account, &merchant(2)), 1000);
    assert_eq!(chain.sent_to(&account, &payer), 500);
}

#[tokio::test]
async fn cancel_with_credit_refunds_and_deletes() {
    let chain = Arc::new(FakeChainAdapter::new());
    let ctl = controller(chain.clone());

    let (id, account) = ctl.new_payment(&merchant(3).to_display(), &raw_to_display(1000)).await.unwrap();
    let payer = Address::from_bytes([22u8; 32]);
    chain.seed_pending(&account, 700, &payer);
    // Absorb the pending receive onto the account before cancelling, mirroring
    // a payment that received partial credit before the merchant gave up.
    let keypair = KeyPair::derive(&[42u8; 32], chain.index_hint(&account));
    chain.receive_all(&keypair).await;

    ctl.cancel_payment(&id).await.unwrap();

    assert!(matches!(
        ctl.status_payment(&id),
        Err(nanorelay_core::PaymentError::NotFound)
    ));
    assert_eq!(chain.balance_of(&account), 0);
    assert_eq!(chain.sent_to(&account, &payer), 700);
}

#[tokio::test]
async fn cancel_after_settlement_is_rejected() {
    let chain = Arc::new(FakeChainAdapter::new());
    let ctl = controller(chain.clone());

    let (id, account) = ctl.new_payment(&merchant(4).to_display(), &raw_to_display(1000)).await.unwrap();
    chain.seed_pending(&account, 1000, &Address::from_bytes([5u8; 32]));
    ctl.wait_payment(&id, Some(Duration::from_secs(5))).await.unwrap();

    let result = ctl.cancel_payment(&id).await;
    assert!(matches!(result, Err(nanorelay_core::PaymentError::Conflict(_))));
}

#[tokio::test]
async fn handoff_submits_and_resubmission_rules_hold() {
    let chain = Arc::new(FakeChainAdapter::new());
    let ctl = controller(chain.clone());

    let (id, account) = ctl.new_payment(&merchant(7).to_display(), &raw_to_display(1000)).await.unwrap();
    let payer = Address::from_bytes([33u8; 32]);
    chain.seed_pending(&account, 1000, &payer);
    let keypair = KeyPair::derive(&[42u8; 32], chain.index_hint(&account));
    chain.receive_all(&keypair).await;

    let info = chain.account_info(&account).await.unwrap().unwrap();
    let block = build_send(&keypair, info.frontier, info.balance, &merchant(7), 1000);

    let hash = ctl.handoff_payment(&id, block.clone()).await.unwrap();
    assert_eq!(ctl.status_payment(&id).unwrap(), Some(hash));
    assert_eq!(chain.sent_to(&account, &merchant(7)), 1000);

    // Resubmitting the identical block is idempotent (§9, open question ii).
    let resubmit_hash = ctl.handoff_payment(&id, block).await.unwrap();
    assert_eq!(resubmit_hash, hash);

    // A different block for the same id conflicts.
    let other = build_send(&keypair, info.frontier, info.balance, &merchant(7), 999);
    let result = ctl.handoff_payment(&id, other).await;
    assert!(matches!(result, Err(nanorelay_core::PaymentError::Conflict(_))));
}

#[tokio::test]
async fn scavenger_sweep_frees_a_stale_allocation() {
    let chain = Arc::new(FakeChainAdapter::new());
    let ctl = Arc::new(controller(chain.clone()));

    let (id, _account) = ctl.new_payment(&merchant(6).to_display(), &raw_to_display(1000)).await.unwrap();
    let index = ctl.store().index_of(&id).unwrap().unwrap();

    // Backdate the allocation past the expiry window.
    let long_ago = unix_now() - 10_000;
    ctl.store().free(&id).unwrap();
    ctl.store().allocate(&id, 0, long_ago).unwrap();
    assert_eq!(ctl.store().index_of(&id).unwrap(), Some(index));

    crate::scavenger::run_once_for_test(&ctl).await;

    assert!(ctl.store().get_payment(&id).unwrap().is_none());
    assert_eq!(ctl.store().index_of(&id).unwrap(), None);
}
