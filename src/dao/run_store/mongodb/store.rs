use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGroupDocument, MongoRecordDocument, MongoRowDocument, MongoUserDocument, bson_time,
        bson_uuid, doc_id,
    },
};
use crate::dao::{
    models::{GroupEntity, GroupTag, LeaderboardRowEntity, RecordEntity, UserEntity},
    run_store::RunStore,
    storage::StorageResult,
};

const USERS: &str = "users";
const GROUPS: &str = "groups";
const RECORDS: &str = "records";
const ROWS: &str = "leaderboard_rows";

/// [`RunStore`] persisting every entity into its own MongoDB collection.
#[derive(Clone)]
pub struct MongoRunStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: Database,
}

impl MongoRunStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;
        let store = Self {
            inner: Arc::new(MongoInner { database }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let indexes: [(&'static str, &'static str, Document); 4] = [
            (GROUPS, "group_active_end_idx", doc! {"active": 1, "end_time": 1}),
            (RECORDS, "record_user_distance_idx", doc! {"user_id": 1, "distance_m": -1}),
            (RECORDS, "record_group_idx", doc! {"group_id": 1}),
            (ROWS, "row_group_idx", doc! {"group_id": 1, "joined_at": 1}),
        ];

        for (collection, name, keys) in indexes {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();
            self.inner
                .database
                .collection::<Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        Ok(())
    }

    fn users(&self) -> Collection<MongoUserDocument> {
        self.inner.database.collection(USERS)
    }

    fn groups(&self) -> Collection<MongoGroupDocument> {
        self.inner.database.collection(GROUPS)
    }

    fn records(&self) -> Collection<MongoRecordDocument> {
        self.inner.database.collection(RECORDS)
    }

    fn rows(&self) -> Collection<MongoRowDocument> {
        self.inner.database.collection(ROWS)
    }

    async fn ping(&self) -> MongoResult<()> {
        self.inner
            .database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn save_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id;
        let document: MongoUserDocument = user.into();
        self.users()
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                entity: "user",
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> MongoResult<Option<UserEntity>> {
        let document = self
            .users()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: "user",
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn find_users(&self, ids: Vec<Uuid>) -> MongoResult<Vec<UserEntity>> {
        let ids: Vec<_> = ids.into_iter().map(bson_uuid).collect();
        let documents: Vec<MongoUserDocument> = self
            .users()
            .find(doc! {"_id": {"$in": ids}})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: USERS,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: USERS,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_group(&self, group: GroupEntity) -> MongoResult<()> {
        let id = group.id;
        let document: MongoGroupDocument = group.into();
        self.groups()
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                entity: "group",
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> MongoResult<Option<GroupEntity>> {
        let document = self
            .groups()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: "group",
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn query_groups(&self, filter: Document) -> MongoResult<Vec<GroupEntity>> {
        let documents: Vec<MongoGroupDocument> = self
            .groups()
            .find(filter)
            .sort(doc! {"start_time": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: GROUPS,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: GROUPS,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_record(&self, record: RecordEntity) -> MongoResult<()> {
        let id = record.id;
        let document: MongoRecordDocument = record.into();
        self.records()
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                entity: "record",
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_record(&self, id: Uuid) -> MongoResult<Option<RecordEntity>> {
        let document = self
            .records()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: "record",
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn query_records(
        &self,
        filter: Document,
        sort: Document,
    ) -> MongoResult<Vec<RecordEntity>> {
        let documents: Vec<MongoRecordDocument> = self
            .records()
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: RECORDS,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: RECORDS,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_rows(&self, rows: Vec<LeaderboardRowEntity>) -> MongoResult<()> {
        let collection = self.rows();
        for row in rows {
            let id = row.record_id;
            let document: MongoRowDocument = row.into();
            collection
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Save {
                    entity: "leaderboard row",
                    id,
                    source,
                })?;
        }
        Ok(())
    }

    async fn find_row(&self, record_id: Uuid) -> MongoResult<Option<LeaderboardRowEntity>> {
        let document = self
            .rows()
            .find_one(doc_id(record_id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: "leaderboard row",
                id: record_id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn query_rows(&self, filter: Document) -> MongoResult<Vec<LeaderboardRowEntity>> {
        let documents: Vec<MongoRowDocument> = self
            .rows()
            .find(filter)
            .sort(doc! {"joined_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: ROWS,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: ROWS,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    /// Removes the row first so a failed record delete can put it back.
    async fn delete_participation(&self, record_id: Uuid) -> MongoResult<bool> {
        let row = self
            .rows()
            .find_one(doc_id(record_id))
            .await
            .map_err(|source| MongoDaoError::Load {
                entity: "leaderboard row",
                id: record_id,
                source,
            })?;
        let rows = self
            .rows()
            .delete_one(doc_id(record_id))
            .await
            .map_err(|source| MongoDaoError::DeleteParticipation {
                id: record_id,
                source,
            })?;
        let records = match self.records().delete_one(doc_id(record_id)).await {
            Ok(result) => result,
            Err(source) => {
                if let Some(row) = row {
                    if let Err(err) = self
                        .rows()
                        .replace_one(doc_id(record_id), &row)
                        .upsert(true)
                        .await
                    {
                        warn!(%record_id, error = %err, "failed to restore leaderboard row");
                    }
                }
                return Err(MongoDaoError::DeleteParticipation {
                    id: record_id,
                    source,
                });
            }
        };
        Ok(records.deleted_count + rows.deleted_count > 0)
    }
}

impl RunStore for MongoRunStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_users(ids).await.map_err(Into::into) })
    }

    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_group(group).await.map_err(Into::into) })
    }

    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_group(id).await.map_err(Into::into) })
    }

    fn list_active_groups(&self) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_groups(doc! {"active": true})
                .await
                .map_err(Into::into)
        })
    }

    fn find_expired_active_groups(
        &self,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_groups(doc! {"active": true, "end_time": {"$lt": bson_time(now)}})
                .await
                .map_err(Into::into)
        })
    }

    fn find_active_groups_by_tag(
        &self,
        tag: GroupTag,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_groups(doc! {"active": true, "tag": tag.as_str()})
                .await
                .map_err(Into::into)
        })
    }

    fn save_record(&self, record: RecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_record(record).await.map_err(Into::into) })
    }

    fn find_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_record(id).await.map_err(Into::into) })
    }

    fn records_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_records(
                    doc! {"user_id": bson_uuid(user_id)},
                    doc! {"distance_m": -1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn records_for_group(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_records(
                    doc! {"group_id": bson_uuid(group_id)},
                    doc! {"started_at": 1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn save_rows(&self, rows: Vec<LeaderboardRowEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_rows(rows).await.map_err(Into::into) })
    }

    fn find_row(
        &self,
        record_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardRowEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_row(record_id).await.map_err(Into::into) })
    }

    fn rows_for_group(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_rows(doc! {"group_id": bson_uuid(group_id)})
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_row_in_group(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardRowEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store
                .query_rows(doc! {"group_id": bson_uuid(group_id), "user_id": bson_uuid(user_id)})
                .await?;
            Ok(rows.into_iter().next())
        })
    }

    fn delete_participation(&self, record_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_participation(record_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
