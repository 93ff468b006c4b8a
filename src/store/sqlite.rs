use std::future::Future;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;

use super::schema::documents;
use super::{
    ensure_id, Collection, DeleteResult, Document, DocumentStore, Filter, FindOptions, Patch,
    UpdateOne, UpdateResult,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
const DELETE_CHUNK: usize = 500;

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

#[derive(Queryable)]
struct DocumentRow {
    seq: i32,
    #[allow(dead_code)]
    collection: String,
    #[allow(dead_code)]
    doc_id: String,
    body: String,
}

#[derive(Insertable)]
#[diesel(table_name = documents)]
struct NewDocumentRow<'a> {
    collection: &'a str,
    doc_id: &'a str,
    body: &'a str,
}

/// Document store over a single SQLite table.
///
/// Each document is one row holding its JSON body; `seq` preserves insertion
/// order. Filters are evaluated in process with [`Filter::matches`], with a
/// fast path for plain `_id` lookups.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    path: String,
}

impl SqliteDocumentStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        crate::db::ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| PlanboardError::Storage(e.to_string()))?;
        tracing::debug!(path = sqlite_path, "Opened SQLite document store");
        Ok(Self {
            pool,
            path: sqlite_path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        checkout(&self.pool).await
    }

    /// Runs a read-modify-write on its own task so a dropped caller cannot
    /// leave a transaction open on a pooled connection.
    async fn write<R, F, Fut>(&self, op: F) -> Result<R>
    where
        F: FnOnce(SqlitePool) -> Fut,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Send + 'static,
    {
        tokio::spawn(op(self.pool.clone()))
            .await
            .map_err(|e| PlanboardError::Runtime(e.to_string()))?
    }
}

async fn checkout(pool: &SqlitePool) -> Result<SqlitePooledConn<'_>> {
    let mut conn = pool
        .get()
        .await
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;
    crate::db::configure_connection_async(&mut conn).await?;
    Ok(conn)
}

async fn execute_raw(conn: &mut SqlitePooledConn<'_>, sql: &str) -> Result<()> {
    diesel::sql_query(sql)
        .execute(conn)
        .await
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;
    Ok(())
}

/// Takes the write lock up front so the read and the write of one document
/// cannot interleave with another writer.
async fn begin_immediate(conn: &mut SqlitePooledConn<'_>) -> Result<()> {
    execute_raw(conn, "BEGIN IMMEDIATE").await
}

async fn finish<T>(conn: &mut SqlitePooledConn<'_>, outcome: Result<T>) -> Result<T> {
    let outcome = match outcome {
        Ok(value) => execute_raw(conn, "COMMIT").await.map(|()| value),
        Err(err) => Err(err),
    };
    match outcome {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(rollback) = execute_raw(conn, "ROLLBACK").await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn update_in_tx(
    conn: &mut SqlitePooledConn<'_>,
    collection: Collection,
    filter: &Filter,
    patch: &Patch,
) -> Result<UpdateResult> {
    begin_immediate(conn).await?;
    let outcome = update_first(conn, collection, filter, patch).await;
    finish(conn, outcome).await
}

async fn delete_in_tx(
    conn: &mut SqlitePooledConn<'_>,
    collection: Collection,
    filter: &Filter,
    first_only: bool,
) -> Result<u64> {
    begin_immediate(conn).await?;
    let outcome = async {
        let mut seqs: Vec<i32> = load_matching(conn, collection, filter)
            .await?
            .into_iter()
            .map(|(seq, _)| seq)
            .collect();
        if first_only {
            seqs.truncate(1);
        }
        delete_seqs(conn, &seqs).await
    }
    .await;
    finish(conn, outcome).await
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = crate::db::open_connection_sync(&database_url)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| PlanboardError::Storage(e.to_string()))?;
        Ok::<_, PlanboardError>(())
    })
    .await
    .map_err(|e| PlanboardError::Runtime(e.to_string()))??;
    Ok(())
}

/// Matching rows of `collection` in insertion order, paired with their seq.
async fn load_matching(
    conn: &mut SqlitePooledConn<'_>,
    collection: Collection,
    filter: &Filter,
) -> Result<Vec<(i32, Document)>> {
    let mut query = documents::table
        .filter(documents::collection.eq(collection.name()))
        .into_boxed();
    if let Some(id) = filter.target_id() {
        query = query.filter(documents::doc_id.eq(id.to_ascii_lowercase()));
    }

    let rows: Vec<DocumentRow> = query
        .order(documents::seq.asc())
        .load(conn)
        .await
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let doc: Document = serde_json::from_str(&row.body)?;
        if filter.matches(&doc) {
            out.push((row.seq, doc));
        }
    }
    Ok(out)
}

async fn write_body(conn: &mut SqlitePooledConn<'_>, seq: i32, doc: &Document) -> Result<()> {
    let body = serde_json::to_string(doc)?;
    diesel::update(documents::table.filter(documents::seq.eq(seq)))
        .set(documents::body.eq(body))
        .execute(conn)
        .await
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;
    Ok(())
}

async fn update_first(
    conn: &mut SqlitePooledConn<'_>,
    collection: Collection,
    filter: &Filter,
    patch: &Patch,
) -> Result<UpdateResult> {
    let mut result = UpdateResult::default();
    let Some((seq, mut doc)) = load_matching(conn, collection, filter)
        .await?
        .into_iter()
        .next()
    else {
        return Ok(result);
    };

    result.matched = 1;
    if patch.apply(&mut doc) {
        write_body(conn, seq, &doc).await?;
        result.modified = 1;
    }
    Ok(result)
}

async fn delete_seqs(conn: &mut SqlitePooledConn<'_>, seqs: &[i32]) -> Result<u64> {
    let mut deleted = 0u64;
    for chunk in seqs.chunks(DELETE_CHUNK) {
        let count = diesel::delete(documents::table.filter(documents::seq.eq_any(chunk)))
            .execute(conn)
            .await
            .map_err(|e| PlanboardError::Storage(e.to_string()))?;
        deleted += count as u64;
    }
    Ok(deleted)
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<ObjectRef> {
        let id = ensure_id(&mut doc)?;
        let doc_id = id.to_hex();
        let body = serde_json::to_string(&doc)?;
        let new = NewDocumentRow {
            collection: collection.name(),
            doc_id: &doc_id,
            body: &body,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(documents::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| PlanboardError::Storage(e.to_string()))?;
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>> {
        let options = options.clone().limit(1);
        Ok(self
            .find(collection, filter, &options)
            .await?
            .into_iter()
            .next())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let mut conn = self.conn().await?;
        let docs = load_matching(&mut conn, collection, filter)
            .await?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        Ok(options.apply(docs))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64> {
        let mut conn = self.conn().await?;
        Ok(load_matching(&mut conn, collection, filter).await?.len() as u64)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult> {
        let filter = filter.clone();
        let patch = patch.clone();
        self.write(move |pool| async move {
            let mut conn = checkout(&pool).await?;
            update_in_tx(&mut conn, collection, &filter, &patch).await
        })
        .await
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult> {
        let filter = filter.clone();
        let deleted = self
            .write(move |pool| async move {
                let mut conn = checkout(&pool).await?;
                delete_in_tx(&mut conn, collection, &filter, true).await
            })
            .await?;
        Ok(DeleteResult { deleted })
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteResult> {
        let filter = filter.clone();
        let deleted = self
            .write(move |pool| async move {
                let mut conn = checkout(&pool).await?;
                delete_in_tx(&mut conn, collection, &filter, false).await
            })
            .await?;
        Ok(DeleteResult { deleted })
    }

    /// One transaction per instruction: each document update is atomic, the
    /// batch as a whole is not.
    async fn bulk_write(
        &self,
        collection: Collection,
        ops: &[UpdateOne],
    ) -> Result<UpdateResult> {
        let ops = ops.to_vec();
        self.write(move |pool| async move {
            let mut conn = checkout(&pool).await?;
            let mut total = UpdateResult::default();
            for op in &ops {
                total.absorb(update_in_tx(&mut conn, collection, &op.filter, &op.patch).await?);
            }
            Ok(total)
        })
        .await
    }
}
