//! Category Service
//!
//! Category CRUD. The full list is cached; single lookups go to the store.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::catalog::{CatalogError, CatalogResult};
use crate::cache::{keys, CacheLayer};
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use crate::repository::{constraints, CategoryStore, StoreError};
use crate::utils::validation::{generate_slug, non_blank};

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
    cache: CacheLayer,
    list_ttl: Duration,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryStore>, cache: CacheLayer, list_ttl: Duration) -> Self {
        Self {
            categories,
            cache,
            list_ttl,
        }
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> CatalogResult<Category> {
        let name = request.name.trim().to_string();
        let slug = non_blank(request.slug).unwrap_or_else(|| generate_slug(&name));
        if slug.is_empty() {
            return Err(CatalogError::Validation(
                "name must contain at least one letter or digit".to_string(),
            ));
        }

        if self.categories.get_by_slug(&slug).await?.is_some() {
            return Err(CatalogError::SlugExists);
        }

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name,
            description: non_blank(request.description),
            slug,
            created_at: now,
            updated_at: now,
        };

        self.categories
            .create(&category)
            .await
            .map_err(unique_violation)?;
        self.cache.invalidate(&[keys::ALL_CATEGORIES]).await;

        log::info!("created category {} ({})", category.slug, category.id);
        Ok(category)
    }

    pub async fn get_by_id(&self, id: Uuid) -> CatalogResult<Category> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    pub async fn get_by_slug(&self, slug: &str) -> CatalogResult<Category> {
        self.categories
            .get_by_slug(slug)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    /// Partial update; blank fields keep their current value
    pub async fn update(&self, id: Uuid, request: UpdateCategoryRequest) -> CatalogResult<Category> {
        let mut category = self.get_by_id(id).await?;

        if let Some(name) = non_blank(request.name) {
            category.name = name;
        }
        if let Some(description) = non_blank(request.description) {
            category.description = Some(description);
        }
        if let Some(slug) = non_blank(request.slug) {
            if slug != category.slug {
                if let Some(other) = self.categories.get_by_slug(&slug).await? {
                    if other.id != id {
                        return Err(CatalogError::SlugExists);
                    }
                }
                category.slug = slug;
            }
        }
        category.updated_at = Utc::now();

        if !self
            .categories
            .update(&category)
            .await
            .map_err(unique_violation)?
        {
            return Err(CatalogError::CategoryNotFound);
        }
        self.cache.invalidate(&[keys::ALL_CATEGORIES]).await;

        Ok(category)
    }

    pub async fn delete(&self, id: Uuid) -> CatalogResult<()> {
        if !self.categories.delete(id).await? {
            return Err(CatalogError::CategoryNotFound);
        }
        self.cache.invalidate(&[keys::ALL_CATEGORIES]).await;

        log::info!("deleted category {}", id);
        Ok(())
    }

    /// Every category ordered by name, served from `categories:all` when cached
    pub async fn list(&self) -> CatalogResult<Vec<Category>> {
        if let Some(categories) = self.cache.read::<Vec<Category>>(keys::ALL_CATEGORIES).await {
            return Ok(categories);
        }

        let categories = self.categories.list().await?;
        self.cache
            .populate(keys::ALL_CATEGORIES, &categories, self.list_ttl)
            .await;
        Ok(categories)
    }
}

fn unique_violation(err: StoreError) -> CatalogError {
    if err.is_duplicate_of(constraints::CATEGORIES_SLUG) {
        CatalogError::SlugExists
    } else if err.is_duplicate_of(constraints::CATEGORIES_NAME) {
        CatalogError::CategoryNameExists
    } else {
        CatalogError::Store(err)
    }
}
