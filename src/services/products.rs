use crate::{
    entities::{album, package, package_album, product_type, product_variation},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Price must not be negative".into());
        Err(err)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductTypeInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVariationInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(custom = "validate_non_negative_decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub is_downloadable: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageInput {
    pub institution_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(custom = "validate_non_negative_decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub is_downloadable: bool,
    #[validate(length(min = 1, message = "A package must bundle at least one album"))]
    pub album_ids: Vec<Uuid>,
}

/// A package with its bundled albums resolved.
#[derive(Debug, Serialize)]
pub struct PackageDetail {
    pub package: package::Model,
    pub albums: Vec<album::Model>,
}

/// Administers product types, their variations, and album packages.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_product_type(
        &self,
        input: CreateProductTypeInput,
    ) -> Result<product_type::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = product_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn list_product_types(&self) -> Result<Vec<product_type::Model>, ServiceError> {
        product_type::Entity::find()
            .order_by_asc(product_type::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, input))]
    pub async fn create_variation(
        &self,
        product_type_id: Uuid,
        input: CreateVariationInput,
    ) -> Result<product_variation::Model, ServiceError> {
        input.validate()?;
        product_type::Entity::find_by_id(product_type_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product type {} not found", product_type_id))
            })?;

        let now = Utc::now();
        let model = product_variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_type_id: Set(product_type_id),
            name: Set(input.name),
            price: Set(input.price),
            is_downloadable: Set(input.is_downloadable),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn list_variations(
        &self,
        product_type_id: Uuid,
    ) -> Result<Vec<product_variation::Model>, ServiceError> {
        product_variation::Entity::find()
            .filter(product_variation::Column::ProductTypeId.eq(product_type_id))
            .order_by_asc(product_variation::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Creates a package and its album membership rows in one transaction.
    /// Every referenced album must exist and be enabled.
    #[instrument(skip(self, input))]
    pub async fn create_package(
        &self,
        input: CreatePackageInput,
    ) -> Result<PackageDetail, ServiceError> {
        input.validate()?;

        let albums = album::Entity::find()
            .filter(album::Column::Id.is_in(input.album_ids.clone()))
            .filter(album::Column::IsEnabled.eq(true))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if albums.len() < input.album_ids.len() {
            return Err(ServiceError::InvalidReference("Album".to_string()));
        }

        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        let now = Utc::now();
        let package_id = Uuid::new_v4();
        let model = package::ActiveModel {
            id: Set(package_id),
            institution_id: Set(input.institution_id),
            name: Set(input.name),
            price: Set(input.price),
            is_downloadable: Set(input.is_downloadable),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let stored = model.insert(&txn).await.map_err(ServiceError::db_error)?;

        for album_id in &input.album_ids {
            let row = package_album::ActiveModel {
                id: Set(Uuid::new_v4()),
                package_id: Set(package_id),
                album_id: Set(*album_id),
            };
            row.insert(&txn).await.map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        Ok(PackageDetail {
            package: stored,
            albums,
        })
    }

    pub async fn list_packages(
        &self,
        institution_id: Option<Uuid>,
    ) -> Result<Vec<package::Model>, ServiceError> {
        let mut query = package::Entity::find().order_by_asc(package::Column::Name);
        if let Some(institution_id) = institution_id {
            query = query.filter(package::Column::InstitutionId.eq(institution_id));
        }
        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_package(&self, id: Uuid) -> Result<PackageDetail, ServiceError> {
        let package = package::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Package {} not found", id)))?;

        let album_ids: Vec<Uuid> = package_album::Entity::find()
            .filter(package_album::Column::PackageId.eq(id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|row| row.album_id)
            .collect();

        let albums = album::Entity::find()
            .filter(album::Column::Id.is_in(album_ids))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(PackageDetail { package, albums })
    }

    #[instrument(skip(self))]
    pub async fn set_package_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<package::Model, ServiceError> {
        let existing = package::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Package {} not found", id)))?;
        let mut update: package::ActiveModel = existing.into();
        update.is_enabled = Set(enabled);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }
}
