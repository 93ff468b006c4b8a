use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::tempdir;

use planboard::aggregation::{ListingShape, TaskAggregator};
use planboard::model::{NewPlan, NewTask, NewTaskList, NewUser, Priority};
use planboard::store::{DocumentStore, MemoryStore, SqliteDocumentStore};
use planboard::{ObjectRef, Planboard};

async fn seed(board: &Planboard, lists: usize, tasks_per_list: usize) -> ObjectRef {
    let user = board
        .users
        .create(NewUser {
            username: "bench".to_string(),
            email: "bench@example.com".to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap();
    let plan = board
        .plans
        .create(NewPlan {
            title: "Bench plan".to_string(),
            description: String::new(),
            user_id: user.id.to_hex(),
        })
        .await
        .unwrap();
    for l in 0..lists {
        let list = board
            .task_lists
            .create(NewTaskList {
                title: format!("List {l}"),
                description: String::new(),
                plan_id: plan.id.to_hex(),
            })
            .await
            .unwrap();
        for t in 0..tasks_per_list {
            board
                .tasks
                .create(NewTask {
                    title: format!("Task {l}.{t}"),
                    description: String::new(),
                    task_list_id: list.id.to_hex(),
                    due_date: 0,
                    priority: Priority::Low,
                    status: Default::default(),
                })
                .await
                .unwrap();
        }
    }
    plan.id
}

fn bench_aggregation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("bench.db");

    let memory: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let sqlite: Arc<dyn DocumentStore> = rt.block_on(async {
        Arc::new(
            SqliteDocumentStore::new(db_path.to_str().unwrap())
                .await
                .unwrap(),
        )
    });

    let mut group = c.benchmark_group("aggregation");
    for (name, store) in [("memory", memory), ("sqlite", sqlite)] {
        let board = Planboard::with_store(store.clone());
        let plan_id = rt.block_on(seed(&board, 10, 20));
        let aggregator = TaskAggregator::new(store);

        group.bench_function(BenchmarkId::new("plan_with_tasks", name), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let _ = aggregator
                        .list_task_lists_for_plan(&plan_id, ListingShape::WithTasks)
                        .await
                        .unwrap();
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
