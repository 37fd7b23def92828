//! Tests for the opt-in task retention sweep.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{InstantBackend, StepBackend};
use diffrhythm_api::background::task_retention;
use diffrhythm_core::types::TaskParams;
use diffrhythm_tasks::{TaskKind, TaskRegistry};
use tokio_util::sync::CancellationToken;

async fn wait_idle(registry: &TaskRegistry) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("tasks did not settle");
}

// ---------------------------------------------------------------------------
// Test: a zero-hour retention evicts finished tasks on the first sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_evicts_finished_tasks_only() {
    let step = StepBackend::new(vec![]);
    let running = Arc::new(TaskRegistry::new(step.clone()));
    let running_id = running.create(TaskKind::Generate, TaskParams::new());

    let finished = Arc::new(TaskRegistry::new(Arc::new(InstantBackend)));
    let done_id = finished.create(TaskKind::Generate, TaskParams::new());
    wait_idle(&finished).await;

    // Let the finished task age past a zero-hour cutoff.
    tokio::time::sleep(Duration::from_millis(5)).await;

    let cancel = CancellationToken::new();
    let sweeps = [
        tokio::spawn(task_retention::run_with_interval(
            Arc::clone(&finished),
            0,
            Duration::from_millis(10),
            cancel.clone(),
        )),
        tokio::spawn(task_retention::run_with_interval(
            Arc::clone(&running),
            0,
            Duration::from_millis(10),
            cancel.clone(),
        )),
    ];

    tokio::time::timeout(Duration::from_secs(5), async {
        while finished.get(done_id).is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("finished task was never evicted");

    assert!(running.get(running_id).is_some(), "active task must survive");

    cancel.cancel();
    for sweep in sweeps {
        tokio::time::timeout(Duration::from_secs(5), sweep)
            .await
            .expect("sweep did not stop on cancel")
            .unwrap();
    }
    step.finish();
}

// ---------------------------------------------------------------------------
// Test: a long retention keeps recent tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recent_tasks_are_kept() {
    let registry = Arc::new(TaskRegistry::new(Arc::new(InstantBackend)));
    let id = registry.create(TaskKind::Generate, TaskParams::new());
    wait_idle(&registry).await;

    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(task_retention::run_with_interval(
        Arc::clone(&registry),
        24,
        Duration::from_millis(10),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.get(id).is_some());

    cancel.cancel();
    sweep.await.unwrap();
}
