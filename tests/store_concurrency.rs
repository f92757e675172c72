// tests/store_concurrency.rs
//
// Concurrent attempts for the same user must all land in `attempts`,
// for both the in-memory and the file-backed store.

use std::sync::Arc;

use chrono::Utc;
use tempfile::tempdir;

use sentinel_verify::recorder::{
    AccountTier, DecisionRecorder, FileUserStore, MemoryUserStore, UserIdentity, UserStore,
};
use sentinel_verify::{EvaluationContext, Verdict};

const WRITERS: usize = 32;

async fn hammer(store: Arc<dyn UserStore>) {
    let recorder = DecisionRecorder::new(store.clone());
    let user = UserIdentity::new("same-user", "same");

    let mut tasks = Vec::new();
    for i in 0..WRITERS {
        let recorder = recorder.clone();
        let user = user.clone();
        tasks.push(tokio::spawn(async move {
            let ctx = EvaluationContext::new(format!("attempt {i}"), i % 2 == 0).at(Utc::now());
            recorder
                .record(&user, &ctx, &Verdict::empty(), AccountTier::from_privileged(i % 2 == 0))
                .await
                .expect("record");
        }));
    }
    for t in tasks {
        t.await.expect("join");
    }

    let state = store.get_user_state("same-user").await.expect("state");
    assert_eq!(state.attempts.len(), WRITERS);

    let mut texts: Vec<String> = state.attempts.iter().map(|a| a.subject_text.clone()).collect();
    texts.sort();
    texts.dedup();
    assert_eq!(texts.len(), WRITERS, "no attempt lost or duplicated");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_store_keeps_every_concurrent_attempt() {
    hammer(Arc::new(MemoryUserStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_store_keeps_every_concurrent_attempt() {
    let dir = tempdir().expect("tempdir");
    let store = FileUserStore::open(dir.path()).await.expect("open");
    hammer(Arc::new(store)).await;
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    {
        let store: Arc<dyn UserStore> = Arc::new(FileUserStore::open(dir.path()).await.unwrap());
        let recorder = DecisionRecorder::new(store);
        let ctx = EvaluationContext::new("hello there", false);
        recorder
            .record(
                &UserIdentity::new("user/with:odd chars", "odd"),
                &ctx,
                &Verdict::empty(),
                AccountTier::Standard,
            )
            .await
            .unwrap();
    }

    let reopened = FileUserStore::open(dir.path()).await.unwrap();
    let state = reopened.get_user_state("user/with:odd chars").await.unwrap();
    assert_eq!(state.display_name, "odd");
    assert_eq!(state.attempts.len(), 1);
}
