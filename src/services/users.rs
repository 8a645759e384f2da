use crate::{
    entities::user::{self, UserRole},
    errors::ServiceError,
    models::cart::Entitlement,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Account management and the entitlement read surface.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            role: Set(input.role),
            download_images: Set(serde_json::json!([])),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    /// The accumulated download entitlements for a user, in grant order.
    pub async fn list_downloads(&self, user_id: Uuid) -> Result<Vec<Entitlement>, ServiceError> {
        let user = self.get_user(user_id).await?;
        Ok(serde_json::from_value(user.download_images).unwrap_or_default())
    }
}
