mod common;

use std::sync::Arc;

use tempfile::tempdir;

use planboard::aggregation::ListingShape;
use planboard::config::{Config, StoreBackend, StoreConfig};
use planboard::error::ErrorKind;
use planboard::model::TaskListListing;
use planboard::resort::ResortItem;
use planboard::services::{ListQuery, PlanShape};
use planboard::store::{Collection, DocumentStore, Filter, FindOptions, Patch, SqliteDocumentStore};
use planboard::{ObjectRef, Planboard};

use common::{count, seed_plan, seed_task, seed_task_list};

async fn sqlite_board(path: &str) -> (Arc<SqliteDocumentStore>, Planboard) {
    let store = Arc::new(SqliteDocumentStore::new(path).await.unwrap());
    let board = Planboard::with_store(store.clone());
    (store, board)
}

#[tokio::test]
async fn sqlite_store_round_trips_documents() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("nested").join("board.db");
    let store = SqliteDocumentStore::new(db_path.to_str().unwrap())
        .await
        .unwrap();

    let mut doc = serde_json::Map::new();
    doc.insert("title".to_string(), "hello".into());
    doc.insert("rank".to_string(), 3.into());
    let id = store.insert_one(Collection::Plans, doc).await.unwrap();

    let found = store
        .find_one(Collection::Plans, &Filter::id(&id), &FindOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found["_id"], id.to_hex());
    assert_eq!(found["title"], "hello");

    let result = store
        .update_one(
            Collection::Plans,
            &Filter::id(&id),
            &Patch::new().set("rank", 3).stamp("updated_at", 1),
        )
        .await
        .unwrap();
    assert_eq!((result.matched, result.modified), (1, 0));

    let result = store
        .update_one(
            Collection::Plans,
            &Filter::id(&id),
            &Patch::new().set("rank", 4).stamp("updated_at", 2),
        )
        .await
        .unwrap();
    assert_eq!((result.matched, result.modified), (1, 1));

    let duplicate = store
        .insert_one(Collection::Plans, found.clone())
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::ServerFault);

    assert_eq!(
        store
            .delete_one(Collection::Plans, &Filter::id(&id))
            .await
            .unwrap()
            .deleted,
        1
    );
    assert_eq!(count(&store, Collection::Plans, Filter::All).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_updates_keep_every_field() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("concurrent.db");
    let store = Arc::new(
        SqliteDocumentStore::new(db_path.to_str().unwrap())
            .await
            .unwrap(),
    );
    let id = store
        .insert_one(Collection::Tasks, serde_json::Map::new())
        .await
        .unwrap();

    let writers = (0..40).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .update_one(
                    Collection::Tasks,
                    &Filter::id(&id),
                    &Patch::new().set(&format!("f{i}"), i),
                )
                .await
        })
    });
    for joined in futures::future::join_all(writers).await {
        let result = joined.unwrap().unwrap();
        assert_eq!((result.matched, result.modified), (1, 1));
    }

    let doc = store
        .find_one(Collection::Tasks, &Filter::id(&id), &FindOptions::default())
        .await
        .unwrap()
        .unwrap();
    for i in 0..40 {
        assert_eq!(doc[&format!("f{i}")], i, "field f{i} was lost");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_delete_one_removes_each_document_once() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("delete-race.db");
    let store = Arc::new(
        SqliteDocumentStore::new(db_path.to_str().unwrap())
            .await
            .unwrap(),
    );
    for _ in 0..5 {
        store
            .insert_one(Collection::Plans, serde_json::Map::new())
            .await
            .unwrap();
    }

    let deleters = (0..10).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.delete_one(Collection::Plans, &Filter::All).await })
    });
    let mut deleted = 0;
    for joined in futures::future::join_all(deleters).await {
        deleted += joined.unwrap().unwrap().deleted;
    }
    assert_eq!(deleted, 5);
    assert_eq!(count(store.as_ref(), Collection::Plans, Filter::All).await, 0);
}

#[tokio::test]
async fn sqlite_cascade_leaves_no_orphans() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("cascade.db");
    let (store, board) = sqlite_board(db_path.to_str().unwrap()).await;

    let plan = seed_plan(&board, "Doomed").await;
    let mut lists = Vec::new();
    for l in 0..2 {
        let list = seed_task_list(&board, &plan, &format!("List {l}")).await;
        for t in 0..3 {
            seed_task(&board, &list, &format!("Task {t}")).await;
        }
        lists.push(list);
    }
    let keeper = seed_plan(&board, "Keeper").await;
    let kept = seed_task_list(&board, &keeper, "Kept").await;
    seed_task(&board, &kept, "Kept task").await;

    let deletion = board.plans.delete(&plan.id.to_hex()).await.unwrap();
    assert_eq!(deletion.task_lists_deleted, 2);
    assert_eq!(deletion.tasks_deleted, 6);

    assert_eq!(count(store.as_ref(), Collection::TaskLists, Filter::All).await, 1);
    assert_eq!(count(store.as_ref(), Collection::Tasks, Filter::All).await, 1);

    let err = board.plans.delete(&plan.id.to_hex()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn sqlite_resort_matches_memory_semantics() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("resort.db");
    let (_store, board) = sqlite_board(db_path.to_str().unwrap()).await;

    let plan = seed_plan(&board, "Board").await;
    let todo = seed_task_list(&board, &plan, "Todo").await;
    let done = seed_task_list(&board, &plan, "Done").await;
    let task = seed_task(&board, &todo, "Move me").await;

    let batch = [ResortItem {
        id: task.id.to_hex(),
        task_list_id: done.id.to_hex(),
        sort_number: 5,
    }];
    let first = board.tasks.bulk_resort(&batch).await.unwrap();
    assert_eq!((first.matched, first.modified), (1, 1));
    let second = board.tasks.bulk_resort(&batch).await.unwrap();
    assert_eq!((second.matched, second.modified), (1, 0));

    let moved = board.tasks.find_by_id(&task.id.to_hex()).await.unwrap();
    assert_eq!(moved.task_list_id, done.id);
    assert_eq!(moved.sort_number, 5);

    let next = seed_task(&board, &done, "After").await;
    assert_eq!(next.sort_number, 6);

    let listing = board
        .task_lists
        .find_all(Some(&plan.id.to_hex()), &ListQuery::default(), ListingShape::WithTasks)
        .await
        .unwrap();
    let TaskListListing::WithTasks(entries) = listing.data else {
        panic!("expected nested listing");
    };
    let done_entry = entries
        .iter()
        .find(|entry| entry.task_list.id == done.id)
        .unwrap();
    assert_eq!(done_entry.tasks.len(), 2);
}

#[tokio::test]
async fn sqlite_data_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("persist.db");
    let path = db_path.to_str().unwrap().to_string();

    let plan_id = {
        let (_store, board) = sqlite_board(&path).await;
        seed_plan(&board, "Durable").await.id
    };

    let config = Config {
        store: StoreConfig {
            backend: StoreBackend::Sqlite,
            sqlite_path: None,
            sqlite_path_override: Some(path),
        },
    };
    let board = Planboard::from_config(&config).await.unwrap();
    let view = board
        .plans
        .find_by_id(&plan_id.to_hex(), PlanShape::Flat)
        .await
        .unwrap();
    assert_eq!(view.plan().title, "Durable");

    let missing = board
        .plans
        .find_by_id(&ObjectRef::new().to_hex(), PlanShape::Flat)
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}
