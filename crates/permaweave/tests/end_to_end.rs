//! End-to-end client flows against the in-memory gateway.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

use permaweave::{
    CancelToken, Client, ClientConfig, ClientError, Keystore, LastTx, Transaction, TxId, TxStage,
    TxStatus,
};
use permaweave_net::gateway::memory::MemoryGateway;
use permaweave_net::SubmissionError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One shared 2048-bit keystore: generation dominates the suite's cost.
fn keystore() -> &'static Keystore {
    static KEY: OnceLock<Keystore> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0xc0ffee);
        Keystore::generate_with_rng(&mut rng, 2048).expect("test keygen")
    })
}

fn client(gateway: MemoryGateway) -> Client<MemoryGateway> {
    client_with(gateway, ClientConfig::default())
}

fn client_with(gateway: MemoryGateway, config: ClientConfig) -> Client<MemoryGateway> {
    Client::new(keystore().clone(), gateway, config)
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_data_transaction_full_lifecycle() -> Result<()> {
    init_tracing();
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    let mut draft = client.data_transaction(b"hello, permanent world".to_vec());
    draft.add_tag("Content-Type", "text/plain");

    let signed = client.sign(draft).await?;
    signed.verify()?;
    assert!(signed.is_inline());

    client.submit(&signed).await?;
    assert_eq!(gateway.submitted_ids().await, vec![signed.id()]);

    gateway.confirm_after(signed.id(), 1, 3).await;
    let record = client
        .await_confirmation(&signed.id(), &CancelToken::never())
        .await?;
    assert_eq!(record.status, TxStatus::Confirmed { confirmations: 3 });

    let data = client.get_data(&signed.id()).await?;
    assert_eq!(data.as_ref(), b"hello, permanent world");
    Ok(())
}

#[tokio::test]
async fn test_chunked_payload_uploads_and_reads_back() -> Result<()> {
    init_tracing();
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    // Three chunks at the default 256 KiB bound.
    let payload = patterned(600_000);
    let signed = client.sign(client.data_transaction(payload.clone())).await?;
    assert!(!signed.is_inline());
    let root = *signed.data_root().expect("chunked tx has a root");

    client.submit(&signed).await?;
    assert_eq!(gateway.chunk_count(&root).await, 3);

    let data = client.get_data(&signed.id()).await?;
    assert_eq!(data.as_ref(), payload.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_reward_comes_from_estimator_with_markup() -> Result<()> {
    let gateway = MemoryGateway::new();
    gateway.set_price(1, 0).await;
    let client = client(gateway);

    let signed = client.sign(client.data_transaction(patterned(1_000))).await?;
    // quote = 1000, +10% markup
    assert_eq!(signed.reward(), 1_100);
    Ok(())
}

#[tokio::test]
async fn test_explicit_reward_skips_estimation() -> Result<()> {
    use permaweave_net::gateway::memory::Endpoint;

    let gateway = MemoryGateway::new();
    // If the client asked for a quote, signing would fail.
    gateway.fail_next(Endpoint::Price, u32::MAX).await;
    let client = client(gateway);

    let mut draft = client.data_transaction(b"prepaid".to_vec());
    draft.set_reward(77_777);
    let signed = client.sign(draft).await?;
    assert_eq!(signed.reward(), 77_777);
    Ok(())
}

#[tokio::test]
async fn test_last_reference_threads_between_transactions() -> Result<()> {
    let gateway = MemoryGateway::new();
    let client = client(gateway);

    let first = client.sign(client.data_transaction(b"first".to_vec())).await?;
    assert!(first.last_tx().is_empty());
    client.submit(&first).await?;

    let second = client.sign(client.data_transaction(b"second".to_vec())).await?;
    assert_eq!(second.last_tx(), &LastTx::from(first.id()));
    Ok(())
}

#[tokio::test]
async fn test_batch_preserves_order_and_reports_middle_failure() -> Result<()> {
    init_tracing();
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    let mut signed = Vec::new();
    for body in [&b"batch one"[..], b"batch two", b"batch three"] {
        signed.push(client.sign(client.data_transaction(body.to_vec())).await?);
    }
    gateway.reject_id(signed[1].id(), "bad anchor").await;

    let outcomes = client.submit_batch(&signed).await;
    assert_eq!(outcomes.len(), 3);
    for (outcome, tx) in outcomes.iter().zip(&signed) {
        assert_eq!(outcome.id, tx.id());
    }
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(
        &outcomes[1].result,
        Err(SubmissionError::Rejected { reason }) if reason == "bad anchor"
    ));
    assert!(outcomes[2].result.is_ok());

    // The rejected transaction never landed; the others did.
    assert_eq!(
        gateway.submitted_ids().await,
        vec![signed[0].id(), signed[2].id()]
    );
    Ok(())
}

#[tokio::test]
async fn test_tracked_transaction_walks_the_stages() -> Result<()> {
    init_tracing();
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    let mut tx = Transaction::from_draft(client.data_transaction(b"staged".to_vec()));
    tx.add_tag("App-Name", "permaweave")?;
    assert_eq!(tx.stage(), TxStage::Draft);

    client.sign_tx(&mut tx).await?;
    assert_eq!(tx.stage(), TxStage::Signed);
    let id = tx.id().expect("signed");

    // Frozen now: further mutation is a hard error.
    let err = tx.add_tag("Too", "late").unwrap_err();
    assert_eq!(err.stage, TxStage::Signed);

    // Signing again is a no-op, not a re-sign.
    client.sign_tx(&mut tx).await?;
    assert_eq!(tx.id(), Some(id));

    client.submit_tx(&mut tx).await?;
    assert_eq!(tx.stage(), TxStage::Submitted);

    let record = client.refresh_tx(&mut tx).await?;
    assert_eq!(record.status, TxStatus::Pending);
    assert_eq!(tx.stage(), TxStage::Pending);

    gateway.confirm_after(id, 0, 6).await;
    client.refresh_tx(&mut tx).await?;
    assert_eq!(tx.stage(), TxStage::Confirmed);
    assert_eq!(tx.confirmations(), 6);
    Ok(())
}

#[tokio::test]
async fn test_submit_rejection_marks_tracked_failed() -> Result<()> {
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    let mut tx = Transaction::from_draft(client.data_transaction(b"doomed".to_vec()));
    client.sign_tx(&mut tx).await?;
    gateway.reject_id(tx.id().unwrap(), "quota exceeded").await;

    let err = client.submit_tx(&mut tx).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Submission(SubmissionError::Rejected { .. })
    ));
    assert_eq!(tx.stage(), TxStage::Failed);
    assert_eq!(tx.failure(), Some("quota exceeded"));
    Ok(())
}

#[tokio::test]
async fn test_dropped_transaction_refreshes_to_failed() -> Result<()> {
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    let mut tx = Transaction::from_draft(client.data_transaction(b"ephemeral".to_vec()));
    client.sign_tx(&mut tx).await?;
    client.submit_tx(&mut tx).await?;
    client.refresh_tx(&mut tx).await?;
    assert_eq!(tx.stage(), TxStage::Pending);

    gateway.drop_transaction(&tx.id().unwrap()).await;
    let record = client.refresh_tx(&mut tx).await?;
    assert_eq!(record.status, TxStatus::Failed);
    assert_eq!(tx.stage(), TxStage::Failed);
    Ok(())
}

#[tokio::test]
async fn test_await_confirmation_of_unknown_id_is_not_found() {
    let client = client(MemoryGateway::new());
    let never_submitted = TxId::from_bytes([0x99; 32]);

    let err = client
        .await_confirmation(&never_submitted, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Track(permaweave_net::TrackError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_scheduled_transaction_refuses_early_submission() -> Result<()> {
    let client = client(MemoryGateway::new());

    let mut draft = client.data_transaction(b"later".to_vec());
    let far_future = 4_000_000_000; // year 2096
    draft.schedule_at(far_future);
    draft.add_metadata(BTreeMap::from([("note".into(), "scheduled".into())]));

    let signed = client.sign(draft).await?;
    match client.submit(&signed).await {
        Err(ClientError::NotYetDue { scheduled_at, .. }) => {
            assert_eq!(scheduled_at, far_future);
        }
        other => panic!("expected NotYetDue, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_canonical_form_survives_the_gateway() -> Result<()> {
    let gateway = MemoryGateway::new();
    let client = client(gateway.clone());

    let mut draft = client.data_transaction(b"round trip".to_vec());
    draft.add_tag("Content-Type", "application/octet-stream");
    let signed = client.sign(draft).await?;
    client.submit(&signed).await?;

    let stored = gateway
        .stored_transaction(&signed.id())
        .await
        .expect("stored");
    assert_eq!(stored, signed.to_canonical_form());

    let rebuilt = permaweave::SignedTransaction::from_canonical_form(&stored)?;
    rebuilt.verify()?;
    assert_eq!(rebuilt.id(), signed.id());
    Ok(())
}

#[tokio::test]
async fn test_network_info_passthrough() -> Result<()> {
    let gateway = MemoryGateway::new();
    gateway.set_network_info(1_234_567, 42).await;
    let client = client(gateway);

    let info = client.network_info().await?;
    assert_eq!(info.height, 1_234_567);
    assert_eq!(info.peers, 42);
    Ok(())
}

#[tokio::test]
async fn test_transient_gateway_faults_are_absorbed() -> Result<()> {
    use permaweave::RetryPolicy;
    use permaweave_net::gateway::memory::Endpoint;
    use std::time::Duration;
    init_tracing();

    let gateway = MemoryGateway::new();
    // Every collaborator call fails twice before succeeding; the retry
    // budget (3 attempts) absorbs all of it.
    gateway.fail_next(Endpoint::Price, 2).await;
    gateway.fail_next(Endpoint::LastTx, 2).await;
    gateway.fail_next(Endpoint::Submit, 2).await;
    let client = client_with(
        gateway.clone(),
        ClientConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
            },
            ..ClientConfig::default()
        },
    );

    let signed = client.sign(client.data_transaction(b"stubborn".to_vec())).await?;
    client.submit(&signed).await?;
    assert_eq!(gateway.submitted_ids().await, vec![signed.id()]);
    Ok(())
}
