use crate::{
    entities::{academic_year, album, course, institution, package, package_album, photo,
        product_variation},
    errors::ServiceError,
    events::{Event, EventSender},
    storage::{ObjectAcl, PhotoStorage},
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const ACCESS_CODE_LEN: usize = 8;
const ACCESS_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInstitutionInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(email)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInstitutionInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAcademicYearInput {
    pub institution_id: Uuid,
    #[validate(length(min = 1, max = 40, message = "Label is required"))]
    pub label: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseInput {
    pub institution_id: Uuid,
    pub academic_year_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    /// Omitted: a random code is generated.
    pub access_code: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub access_code: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAlbumInput {
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub product_type_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddPhotoInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    /// Raw image bytes, already watermark-processed upstream.
    pub body: Vec<u8>,
}

/// One album in a gallery response, with its photos and purchasable options.
#[derive(Debug, Serialize)]
pub struct GalleryAlbum {
    pub album: album::Model,
    pub photos: Vec<photo::Model>,
    pub variations: Vec<product_variation::Model>,
}

/// What a parent sees after unlocking a course gallery.
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub course_id: Uuid,
    pub course_name: String,
    pub albums: Vec<GalleryAlbum>,
    pub packages: Vec<package::Model>,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Administers the institution/year/course/album/photo catalog and serves
/// parent-facing galleries.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    storage: Arc<dyn PhotoStorage>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn PhotoStorage>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            storage,
            event_sender,
        }
    }

    // Institutions

    #[instrument(skip(self, input))]
    pub async fn create_institution(
        &self,
        input: CreateInstitutionInput,
    ) -> Result<institution::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = institution::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            contact_email: Set(input.contact_email),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn list_institutions(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<Paginated<institution::Model>, ServiceError> {
        let paginator = institution::Entity::find()
            .order_by_asc(institution::Column::Name)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn get_institution(&self, id: Uuid) -> Result<institution::Model, ServiceError> {
        institution::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Institution {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update_institution(
        &self,
        id: Uuid,
        input: UpdateInstitutionInput,
    ) -> Result<institution::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_institution(id).await?;
        let mut update: institution::ActiveModel = existing.into();
        if let Some(name) = input.name {
            update.name = Set(name);
        }
        if let Some(email) = input.contact_email {
            update.contact_email = Set(Some(email));
        }
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn set_institution_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<institution::Model, ServiceError> {
        let existing = self.get_institution(id).await?;
        let mut update: institution::ActiveModel = existing.into();
        update.is_enabled = Set(enabled);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    // Academic years

    #[instrument(skip(self, input))]
    pub async fn create_academic_year(
        &self,
        input: CreateAcademicYearInput,
    ) -> Result<academic_year::Model, ServiceError> {
        input.validate()?;
        if input.ends_on <= input.starts_on {
            return Err(ServiceError::ValidationError(
                "Academic year must end after it starts".to_string(),
            ));
        }
        self.get_institution(input.institution_id).await?;

        let now = Utc::now();
        let model = academic_year::ActiveModel {
            id: Set(Uuid::new_v4()),
            institution_id: Set(input.institution_id),
            label: Set(input.label),
            starts_on: Set(input.starts_on),
            ends_on: Set(input.ends_on),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn list_academic_years(
        &self,
        institution_id: Option<Uuid>,
    ) -> Result<Vec<academic_year::Model>, ServiceError> {
        let mut query =
            academic_year::Entity::find().order_by_desc(academic_year::Column::StartsOn);
        if let Some(institution_id) = institution_id {
            query = query.filter(academic_year::Column::InstitutionId.eq(institution_id));
        }
        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn set_academic_year_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<academic_year::Model, ServiceError> {
        let existing = academic_year::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Academic year {} not found", id)))?;
        let mut update: academic_year::ActiveModel = existing.into();
        update.is_enabled = Set(enabled);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    // Courses

    #[instrument(skip(self, input))]
    pub async fn create_course(
        &self,
        input: CreateCourseInput,
    ) -> Result<course::Model, ServiceError> {
        input.validate()?;
        if input.valid_until <= input.valid_from {
            return Err(ServiceError::ValidationError(
                "Course validity window must end after it starts".to_string(),
            ));
        }
        self.get_institution(input.institution_id).await?;

        let access_code = match input.access_code {
            Some(code) if !code.trim().is_empty() => code,
            _ => generate_access_code(),
        };

        let now = Utc::now();
        let model = course::ActiveModel {
            id: Set(Uuid::new_v4()),
            institution_id: Set(input.institution_id),
            academic_year_id: Set(input.academic_year_id),
            name: Set(input.name),
            access_code: Set(access_code),
            valid_from: Set(input.valid_from),
            valid_until: Set(input.valid_until),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn list_courses(
        &self,
        academic_year_id: Option<Uuid>,
    ) -> Result<Vec<course::Model>, ServiceError> {
        let mut query = course::Entity::find().order_by_asc(course::Column::Name);
        if let Some(academic_year_id) = academic_year_id {
            query = query.filter(course::Column::AcademicYearId.eq(academic_year_id));
        }
        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_course(&self, id: Uuid) -> Result<course::Model, ServiceError> {
        course::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update_course(
        &self,
        id: Uuid,
        input: UpdateCourseInput,
    ) -> Result<course::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_course(id).await?;
        let mut update: course::ActiveModel = existing.into();
        if let Some(name) = input.name {
            update.name = Set(name);
        }
        if let Some(code) = input.access_code {
            update.access_code = Set(code);
        }
        if let Some(from) = input.valid_from {
            update.valid_from = Set(from);
        }
        if let Some(until) = input.valid_until {
            update.valid_until = Set(until);
        }
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn set_course_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<course::Model, ServiceError> {
        let existing = self.get_course(id).await?;
        let mut update: course::ActiveModel = existing.into();
        update.is_enabled = Set(enabled);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    // Albums

    #[instrument(skip(self, input))]
    pub async fn create_album(&self, input: CreateAlbumInput) -> Result<album::Model, ServiceError> {
        input.validate()?;
        self.get_course(input.course_id).await?;

        let now = Utc::now();
        let model = album::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(input.course_id),
            name: Set(input.name),
            product_type_id: Set(input.product_type_id),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn list_albums(
        &self,
        course_id: Option<Uuid>,
    ) -> Result<Vec<album::Model>, ServiceError> {
        let mut query = album::Entity::find().order_by_asc(album::Column::Name);
        if let Some(course_id) = course_id {
            query = query.filter(album::Column::CourseId.eq(course_id));
        }
        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_album(&self, id: Uuid) -> Result<album::Model, ServiceError> {
        album::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Album {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn set_album_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<album::Model, ServiceError> {
        let existing = self.get_album(id).await?;
        let mut update: album::ActiveModel = existing.into();
        update.is_enabled = Set(enabled);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    // Photos

    /// Registers a photo: the original goes to private storage, the
    /// watermarked rendition to public storage, and the row records both.
    #[instrument(skip(self, input), fields(album_id = %album_id, name = %input.name))]
    pub async fn add_photo(
        &self,
        album_id: Uuid,
        input: AddPhotoInput,
    ) -> Result<photo::Model, ServiceError> {
        input.validate()?;
        self.get_album(album_id).await?;

        let photo_id = Uuid::new_v4();
        let storage_key = format!("originals/{}.jpg", photo_id);
        let preview_key = format!("previews/{}.jpg", photo_id);

        self.storage
            .upload(&storage_key, input.body.clone(), ObjectAcl::Private)
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
        let preview_url = self
            .storage
            .upload(&preview_key, input.body, ObjectAcl::PublicRead)
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let now = Utc::now();
        let model = photo::ActiveModel {
            id: Set(photo_id),
            album_id: Set(album_id),
            name: Set(input.name),
            storage_key: Set(storage_key),
            preview_url: Set(preview_url),
            is_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let stored = model.insert(&*self.db).await.map_err(ServiceError::db_error)?;

        if let Err(e) = self
            .event_sender
            .send(Event::PhotoUploaded {
                album_id,
                photo_id,
            })
            .await
        {
            warn!(error = %e, %photo_id, "Failed to send photo uploaded event");
        }

        Ok(stored)
    }

    pub async fn list_photos(&self, album_id: Uuid) -> Result<Vec<photo::Model>, ServiceError> {
        photo::Entity::find()
            .filter(photo::Column::AlbumId.eq(album_id))
            .order_by_asc(photo::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Deletes a photo row and its stored objects. Storage cleanup is best
    /// effort; the row removal is the source of truth.
    #[instrument(skip(self))]
    pub async fn delete_photo(&self, photo_id: Uuid) -> Result<(), ServiceError> {
        let existing = photo::Entity::find_by_id(photo_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Photo {} not found", photo_id)))?;

        let keys = vec![
            existing.storage_key.clone(),
            format!("previews/{}.jpg", existing.id),
        ];
        if let Err(e) = self.storage.delete(&keys).await {
            warn!(error = %e, %photo_id, "Failed to delete stored objects for photo");
        }

        existing
            .delete(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        if let Err(e) = self.event_sender.send(Event::PhotoDeleted { photo_id }).await {
            warn!(error = %e, %photo_id, "Failed to send photo deleted event");
        }

        info!(%photo_id, "Photo deleted");
        Ok(())
    }

    // Gallery

    /// Unlocks a course gallery for a parent. The course must be enabled, the
    /// access code must match, and the validity window must be open.
    #[instrument(skip(self, access_code))]
    pub async fn gallery(
        &self,
        course_id: Uuid,
        access_code: &str,
    ) -> Result<GalleryResponse, ServiceError> {
        let course = self.get_course(course_id).await?;
        if !course.is_enabled {
            return Err(ServiceError::NotFound(format!(
                "Course {} not found",
                course_id
            )));
        }
        if course.access_code != access_code {
            return Err(ServiceError::Forbidden(
                "Access code does not match".to_string(),
            ));
        }
        if !course.is_open_at(Utc::now()) {
            return Err(ServiceError::Gone(
                "The gallery for this course is closed".to_string(),
            ));
        }

        let albums = album::Entity::find()
            .filter(album::Column::CourseId.eq(course_id))
            .filter(album::Column::IsEnabled.eq(true))
            .order_by_asc(album::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut gallery_albums = Vec::with_capacity(albums.len());
        for album in albums {
            let photos = photo::Entity::find()
                .filter(photo::Column::AlbumId.eq(album.id))
                .filter(photo::Column::IsEnabled.eq(true))
                .order_by_asc(photo::Column::Name)
                .all(&*self.db)
                .await
                .map_err(ServiceError::db_error)?;

            let variations = match album.product_type_id {
                Some(product_type_id) => product_variation::Entity::find()
                    .filter(product_variation::Column::ProductTypeId.eq(product_type_id))
                    .filter(product_variation::Column::IsEnabled.eq(true))
                    .all(&*self.db)
                    .await
                    .map_err(ServiceError::db_error)?,
                None => Vec::new(),
            };

            gallery_albums.push(GalleryAlbum {
                album,
                photos,
                variations,
            });
        }

        let packages = self
            .packages_covering_course(course.institution_id, course_id)
            .await?;

        Ok(GalleryResponse {
            course_id,
            course_name: course.name,
            albums: gallery_albums,
            packages,
        })
    }

    /// Enabled packages of the institution that bundle at least one album of
    /// this course.
    async fn packages_covering_course(
        &self,
        institution_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<package::Model>, ServiceError> {
        let packages = package::Entity::find()
            .filter(package::Column::InstitutionId.eq(institution_id))
            .filter(package::Column::IsEnabled.eq(true))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let course_albums: Vec<Uuid> = album::Entity::find()
            .filter(album::Column::CourseId.eq(course_id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let mut covering = Vec::new();
        for pkg in packages {
            let bundled = package_album::Entity::find()
                .filter(package_album::Column::PackageId.eq(pkg.id))
                .filter(package_album::Column::AlbumId.is_in(course_albums.clone()))
                .count(&*self.db)
                .await
                .map_err(ServiceError::db_error)?;
            if bundled > 0 {
                covering.push(pkg);
            }
        }
        Ok(covering)
    }
}

/// Random gallery access code from an unambiguous alphabet.
fn generate_access_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ACCESS_CODE_LEN)
        .map(|_| ACCESS_CODE_ALPHABET[rng.gen_range(0..ACCESS_CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_codes_use_unambiguous_alphabet() {
        for _ in 0..50 {
            let code = generate_access_code();
            assert_eq!(code.len(), ACCESS_CODE_LEN);
            assert!(code
                .bytes()
                .all(|b| ACCESS_CODE_ALPHABET.contains(&b)));
            // 0, O, 1 and I are excluded to keep codes readable over the phone
            assert!(!code.contains('0') && !code.contains('O') && !code.contains('1'));
        }
    }
}
