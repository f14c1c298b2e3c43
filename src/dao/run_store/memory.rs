//! In-process arena store keyed by entity ids.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexSet;
use time::OffsetDateTime;
use uuid::Uuid;

use super::RunStore;
use crate::dao::{
    models::{GroupEntity, GroupTag, LeaderboardRowEntity, RecordEntity, UserEntity},
    storage::StorageResult,
};

/// [`RunStore`] backed by concurrent hash maps; nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryRunStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: DashMap<Uuid, UserEntity>,
    groups: DashMap<Uuid, GroupEntity>,
    records: DashMap<Uuid, RecordEntity>,
    rows: DashMap<Uuid, LeaderboardRowEntity>,
    // group id -> record ids in join order
    memberships: DashMap<Uuid, IndexSet<Uuid>>,
}

impl MemoryRunStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn member_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.inner
            .memberships
            .get(&group_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn active_groups_where(&self, predicate: impl Fn(&GroupEntity) -> bool) -> Vec<GroupEntity> {
        let mut groups: Vec<GroupEntity> = self
            .inner
            .groups
            .iter()
            .filter(|entry| entry.active && predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        groups.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        groups
    }

    fn collect_rows(&self, group_id: Uuid) -> Vec<LeaderboardRowEntity> {
        self.member_ids(group_id)
            .into_iter()
            .filter_map(|record_id| self.inner.rows.get(&record_id).map(|row| row.clone()))
            .collect()
    }

    fn remove_participation(&self, record_id: Uuid) -> bool {
        let record = self.inner.records.remove(&record_id);
        let row = self.inner.rows.remove(&record_id);

        let group_id = row
            .as_ref()
            .map(|(_, row)| row.group_id)
            .or_else(|| record.as_ref().map(|(_, record)| record.group_id));
        if let Some(group_id) = group_id {
            if let Some(mut members) = self.inner.memberships.get_mut(&group_id) {
                members.shift_remove(&record_id);
            }
        }

        record.is_some() || row.is_some()
    }
}

impl RunStore for MemoryRunStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.users.insert(user.id, user);
        Box::pin(async { Ok(()) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let user = self.inner.users.get(&id).map(|user| user.clone());
        Box::pin(async move { Ok(user) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let users = ids
            .iter()
            .filter_map(|id| self.inner.users.get(id).map(|user| user.clone()))
            .collect();
        Box::pin(async move { Ok(users) })
    }

    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.groups.insert(group.id, group);
        Box::pin(async { Ok(()) })
    }

    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>> {
        let group = self.inner.groups.get(&id).map(|group| group.clone());
        Box::pin(async move { Ok(group) })
    }

    fn list_active_groups(&self) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let groups = self.active_groups_where(|_| true);
        Box::pin(async move { Ok(groups) })
    }

    fn find_expired_active_groups(
        &self,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let groups = self.active_groups_where(|group| group.ends_at < now);
        Box::pin(async move { Ok(groups) })
    }

    fn find_active_groups_by_tag(
        &self,
        tag: GroupTag,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>> {
        let groups = self.active_groups_where(|group| group.tag == tag);
        Box::pin(async move { Ok(groups) })
    }

    fn save_record(&self, record: RecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.records.insert(record.id, record);
        Box::pin(async { Ok(()) })
    }

    fn find_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RecordEntity>>> {
        let record = self.inner.records.get(&id).map(|record| record.clone());
        Box::pin(async move { Ok(record) })
    }

    fn records_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
        let mut records: Vec<RecordEntity> = self
            .inner
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.distance_m.cmp(&a.distance_m));
        Box::pin(async move { Ok(records) })
    }

    fn records_for_group(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
        let records = self
            .member_ids(group_id)
            .into_iter()
            .filter_map(|record_id| self.inner.records.get(&record_id).map(|r| r.clone()))
            .collect();
        Box::pin(async move { Ok(records) })
    }

    fn save_rows(&self, rows: Vec<LeaderboardRowEntity>) -> BoxFuture<'static, StorageResult<()>> {
        for row in rows {
            self.inner
                .memberships
                .entry(row.group_id)
                .or_default()
                .insert(row.record_id);
            self.inner.rows.insert(row.record_id, row);
        }
        Box::pin(async { Ok(()) })
    }

    fn find_row(
        &self,
        record_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardRowEntity>>> {
        let row = self.inner.rows.get(&record_id).map(|row| row.clone());
        Box::pin(async move { Ok(row) })
    }

    fn rows_for_group(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let rows = self.collect_rows(group_id);
        Box::pin(async move { Ok(rows) })
    }

    fn find_user_row_in_group(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardRowEntity>>> {
        let row = self
            .collect_rows(group_id)
            .into_iter()
            .find(|row| row.user_id == user_id);
        Box::pin(async move { Ok(row) })
    }

    fn delete_participation(&self, record_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let deleted = self.remove_participation(record_id);
        Box::pin(async move { Ok(deleted) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
