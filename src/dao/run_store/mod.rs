pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GroupEntity, GroupTag, LeaderboardRowEntity, RecordEntity, UserEntity};
use crate::dao::storage::StorageResult;

pub use memory::MemoryRunStore;

/// Abstraction over the persistence layer for users, groups, records and leaderboard rows.
///
/// Relationships are plain id fields; every query returns owned entities.
pub trait RunStore: Send + Sync {
    /// Insert or replace a user profile.
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load one user profile.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Load every profile listed in `ids`; unknown ids are skipped.
    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    /// Insert or replace a group.
    fn save_group(&self, group: GroupEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load one group.
    fn find_group(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GroupEntity>>>;
    /// Active groups ordered by start time.
    fn list_active_groups(&self) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>>;
    /// Active groups whose end time precedes `now`.
    fn find_expired_active_groups(
        &self,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>>;
    /// Active groups carrying `tag`, ordered by start time.
    fn find_active_groups_by_tag(
        &self,
        tag: GroupTag,
    ) -> BoxFuture<'static, StorageResult<Vec<GroupEntity>>>;
    /// Insert or replace a record.
    fn save_record(&self, record: RecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load one record.
    fn find_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RecordEntity>>>;
    /// Every record owned by `user_id`, longest distance first.
    fn records_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>>;
    /// Every record participating in `group_id`.
    fn records_for_group(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>>;
    /// Insert or replace a batch of leaderboard rows.
    fn save_rows(&self, rows: Vec<LeaderboardRowEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the row ranking `record_id`.
    fn find_row(
        &self,
        record_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardRowEntity>>>;
    /// Every row of `group_id` in join order.
    fn rows_for_group(
        &self,
        group_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>>;
    /// The row `user_id` holds in `group_id`, if any.
    fn find_user_row_in_group(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LeaderboardRowEntity>>>;
    /// Delete a record together with its leaderboard row, reporting whether anything existed.
    fn delete_participation(&self, record_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Probe the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
