use std::time::SystemTime;

use mongodb::bson::{DateTime, Document, Uuid as BsonUuid, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GroupEntity, GroupTag, LeaderboardRowEntity, RecordEntity, UserEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    nickname: String,
    weight_kg: f64,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            nickname: value.nickname,
            weight_kg: value.weight_kg,
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            nickname: value.nickname,
            weight_kg: value.weight_kg,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGroupDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    title: String,
    tag: GroupTag,
    start_time: DateTime,
    end_time: DateTime,
    target_distance_m: u32,
    max_participants: u32,
    current_participants: u32,
    active: bool,
}

impl From<GroupEntity> for MongoGroupDocument {
    fn from(value: GroupEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            title: value.title,
            tag: value.tag,
            start_time: bson_time(value.starts_at),
            end_time: bson_time(value.ends_at),
            target_distance_m: value.target_distance_m,
            max_participants: value.max_participants,
            current_participants: value.current_participants,
            active: value.active,
        }
    }
}

impl From<MongoGroupDocument> for GroupEntity {
    fn from(value: MongoGroupDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            title: value.title,
            tag: value.tag,
            starts_at: entity_time(value.start_time),
            ends_at: entity_time(value.end_time),
            target_distance_m: value.target_distance_m,
            max_participants: value.max_participants,
            current_participants: value.current_participants,
            active: value.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRecordDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    user_id: BsonUuid,
    group_id: BsonUuid,
    distance_m: u32,
    elapsed_secs: u64,
    calories: f64,
    started_at: DateTime,
    updated_at: DateTime,
}

impl From<RecordEntity> for MongoRecordDocument {
    fn from(value: RecordEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            user_id: bson_uuid(value.user_id),
            group_id: bson_uuid(value.group_id),
            distance_m: value.distance_m,
            elapsed_secs: value.elapsed_secs,
            calories: value.calories,
            started_at: bson_time(value.started_at),
            updated_at: bson_time(value.updated_at),
        }
    }
}

impl From<MongoRecordDocument> for RecordEntity {
    fn from(value: MongoRecordDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            user_id: entity_uuid(value.user_id),
            group_id: entity_uuid(value.group_id),
            distance_m: value.distance_m,
            elapsed_secs: value.elapsed_secs,
            calories: value.calories,
            started_at: entity_time(value.started_at),
            updated_at: entity_time(value.updated_at),
        }
    }
}

/// Leaderboard row keyed by the record it ranks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRowDocument {
    #[serde(rename = "_id")]
    record_id: BsonUuid,
    group_id: BsonUuid,
    user_id: BsonUuid,
    current_rank: u32,
    previous_rank: u32,
    joined_at: DateTime,
}

impl From<LeaderboardRowEntity> for MongoRowDocument {
    fn from(value: LeaderboardRowEntity) -> Self {
        Self {
            record_id: bson_uuid(value.record_id),
            group_id: bson_uuid(value.group_id),
            user_id: bson_uuid(value.user_id),
            current_rank: value.current_rank,
            previous_rank: value.previous_rank,
            joined_at: bson_time(value.joined_at),
        }
    }
}

impl From<MongoRowDocument> for LeaderboardRowEntity {
    fn from(value: MongoRowDocument) -> Self {
        Self {
            record_id: entity_uuid(value.record_id),
            group_id: entity_uuid(value.group_id),
            user_id: entity_uuid(value.user_id),
            current_rank: value.current_rank,
            previous_rank: value.previous_rank,
            joined_at: entity_time(value.joined_at),
        }
    }
}

pub fn bson_uuid(id: Uuid) -> BsonUuid {
    BsonUuid::from_bytes(id.into_bytes())
}

fn entity_uuid(id: BsonUuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn bson_time(value: OffsetDateTime) -> DateTime {
    DateTime::from_system_time(SystemTime::from(value))
}

fn entity_time(value: DateTime) -> OffsetDateTime {
    OffsetDateTime::from(value.to_system_time())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": bson_uuid(id)}
}
