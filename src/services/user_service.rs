//! Registration and profile lookup.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::UserEntity,
    dto::user::{ProfileResponse, RegisterUserRequest, RegisterUserResponse},
    error::ServiceError,
    state::SharedState,
};

/// Create a profile and issue the session token identifying it.
pub async fn register_user(
    state: &SharedState,
    request: RegisterUserRequest,
) -> Result<RegisterUserResponse, ServiceError> {
    let nickname = request.nickname.trim();
    if nickname.is_empty() {
        return Err(ServiceError::InvalidInput("nickname must not be blank".into()));
    }
    if !(request.weight_kg.is_finite() && request.weight_kg > 0.0) {
        return Err(ServiceError::InvalidInput(
            "weight_kg must be a positive number".into(),
        ));
    }

    let user = UserEntity {
        id: Uuid::new_v4(),
        nickname: nickname.to_owned(),
        weight_kg: request.weight_kg,
    };
    let user_id = user.id;
    state.store().save_user(user).await?;
    let session_token = state.sessions().issue(user_id);
    info!(%user_id, nickname, "registered user");

    Ok(RegisterUserResponse {
        user_id,
        session_token,
    })
}

/// Profile of the calling user with totals over every participation.
pub async fn get_profile(
    state: &SharedState,
    user: Option<Uuid>,
) -> Result<ProfileResponse, ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let store = state.store();
    let profile = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}` not found")))?;
    let records = store.records_for_user(user_id).await?;

    Ok(ProfileResponse {
        user_id,
        nickname: profile.nickname,
        weight_kg: profile.weight_kg,
        personal_best_m: records.first().map_or(0, |record| record.distance_m),
        total_distance_m: records
            .iter()
            .map(|record| u64::from(record.distance_m))
            .sum(),
        sessions: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::GroupTag,
        dto::running::SubmitUpdateRequest,
        services::{
            group_service::join_group,
            running_service::submit_update,
            test_support::{NOW, fixed_state, insert_group},
        },
    };

    fn request(nickname: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            nickname: nickname.into(),
            weight_kg: 62.5,
        }
    }

    #[tokio::test]
    async fn registration_issues_a_resolvable_token() {
        let state = fixed_state(NOW);
        let registered = register_user(&state, request("  pacer ")).await.unwrap();

        assert_eq!(
            state.identity().resolve(&registered.session_token),
            Some(registered.user_id)
        );
        let stored = state
            .store()
            .find_user(registered.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.nickname, "pacer");
    }

    #[tokio::test]
    async fn blank_nickname_is_rejected() {
        let state = fixed_state(NOW);
        assert!(matches!(
            register_user(&state, request(" ")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn profile_sums_every_session() {
        let state = fixed_state(NOW);
        let user = register_user(&state, request("pacer")).await.unwrap().user_id;

        let empty = get_profile(&state, Some(user)).await.unwrap();
        assert_eq!((empty.personal_best_m, empty.total_distance_m, empty.sessions), (0, 0, 0));

        for distance_m in [2_000, 5_000] {
            let group = insert_group(&state, GroupTag::Casual, 5).await;
            let joined = join_group(&state, Some(user), group.id).await.unwrap();
            submit_update(
                &state,
                Some(user),
                joined.record_id,
                SubmitUpdateRequest {
                    distance_m,
                    elapsed_secs: 1_200,
                },
            )
            .await
            .unwrap();
        }

        let profile = get_profile(&state, Some(user)).await.unwrap();
        assert_eq!(profile.personal_best_m, 5_000);
        assert_eq!(profile.total_distance_m, 7_000);
        assert_eq!(profile.sessions, 2);
        assert_eq!(profile.nickname, "pacer");
    }

    #[tokio::test]
    async fn profile_requires_a_session() {
        let state = fixed_state(NOW);
        assert!(matches!(
            get_profile(&state, None).await,
            Err(ServiceError::AuthRequired)
        ));
        assert!(matches!(
            get_profile(&state, Some(Uuid::new_v4())).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
