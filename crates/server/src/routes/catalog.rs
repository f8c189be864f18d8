//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::catalog::{CatalogRepository, ProductFilter, ProductSort};
use crate::error::{AppError, Result};
use crate::models::catalog::{Category, Product, Subcategory};
use crate::state::AppState;

/// Products per listing page.
const PAGE_SIZE: i64 = 12;

/// Query parameters accepted by the product listing.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Free-text search over name and description.
    pub q: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub featured: bool,
    /// Zero-based page number.
    #[serde(default)]
    pub page: i64,
}

/// A category with its subcategories, for navigation.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

/// List categories with their subcategories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryView>>> {
    let repo = CatalogRepository::new(state.pool());
    let categories = repo.list_categories().await?;

    let mut views = Vec::with_capacity(categories.len());
    for category in categories {
        let subcategories = repo.list_subcategories(category.id).await?;
        views.push(CategoryView {
            category,
            subcategories,
        });
    }
    Ok(Json(views))
}

/// Product listing with filtering, search, and sorting.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter {
        category_slug: query.category,
        subcategory_slug: query.subcategory,
        min_price: query.min_price,
        max_price: query.max_price,
        search: query.q,
        featured_only: query.featured,
        sort: query.sort,
        limit: PAGE_SIZE,
        offset: query.page.max(0) * PAGE_SIZE,
    };

    let products = CatalogRepository::new(state.pool())
        .list_products(&filter)
        .await?;
    Ok(Json(products))
}

/// Product detail by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let product = CatalogRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;
    Ok(Json(product))
}
