//! End-to-end exercise of the shutdown/cleanup composition: an operation is
//! cancelled mid-flight, and its teardown still finishes its label
//! bookkeeping because it runs under a detached context.

use std::sync::{Arc, Once};

use coffer_core::labels::GC_ROOT_LABEL;
use coffer_core::{Context, Digest, LabelStore, MemoryLabelStore};

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("coffer_core=trace")),
            )
            .with_target(true)
            .try_init();
    });
}

#[derive(Debug, PartialEq)]
struct RequestId(&'static str);

/// Simulates an abortable ingest: bails out as soon as its context is
/// cancelled, handing back the cleanup work it still owes.
async fn ingest(ctx: &Context, store: &MemoryLabelStore, digest: &Digest) -> bool {
    store
        .update(
            digest,
            [(GC_ROOT_LABEL.to_string(), "true".to_string())].into(),
        )
        .await;

    ctx.cancelled().await;
    false
}

/// The teardown an aborted ingest owes: drop the GC root pin and record who
/// cleaned up, using request-scoped data from the (cancelled) originator.
async fn cleanup(ctx: &Context, store: &MemoryLabelStore, digest: &Digest) {
    assert!(
        !ctx.is_cancelled(),
        "cleanup must not inherit the aborted operation's cancellation"
    );
    let request = ctx.value::<RequestId>().expect("request id survives detach");

    store
        .update(
            digest,
            [
                (GC_ROOT_LABEL.to_string(), String::new()),
                ("cleaned-by".to_string(), request.0.to_string()),
            ]
            .into(),
        )
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_ingest_still_completes_teardown() {
    init_tracing();

    let store = Arc::new(MemoryLabelStore::new());
    let digest = Digest::sha256(b"layer data");

    let root = Context::background().with_value(RequestId("req-7"));
    let (op_ctx, cancel) = root.with_cancel();

    let task = {
        let store = Arc::clone(&store);
        let digest = digest.clone();
        tokio::spawn(async move {
            let completed = ingest(&op_ctx, &store, &digest).await;
            assert!(!completed, "ingest should have been aborted");

            // Teardown runs under a detached context derived from the
            // cancelled operation's own context.
            cleanup(&op_ctx.detached(), &store, &digest).await;
        })
    };

    cancel.cancel();
    task.await.expect("ingest task panicked");

    let labels = store.get(&digest).await;
    assert_eq!(labels.get(GC_ROOT_LABEL), None);
    assert_eq!(labels.get("cleaned-by").map(String::as_str), Some("req-7"));
}
