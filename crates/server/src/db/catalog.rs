//! Catalog repository: categories, subcategories, products.
//!
//! Read-mostly. Stock mutation lives in the order repository, inside the
//! materialization and cancellation transactions.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use securecart_core::{CategoryId, Price, ProductId, SubcategoryId};

use super::RepositoryError;
use crate::models::catalog::{Category, Product, Subcategory};

const PRODUCT_COLUMNS: &str = "p.id, p.subcategory_id, p.name, p.slug, p.description, p.price, \
                               p.stock, p.low_stock_threshold, p.featured, p.created_at, \
                               p.updated_at";

// Same columns without the alias, for statements with no join.
const PRODUCT_COLUMNS_BARE: &str = "id, subcategory_id, name, slug, description, price, stock, \
                                    low_stock_threshold, featured, created_at, updated_at";

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Newest first (default).
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub subcategory_slug: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    pub featured_only: bool,
    pub sort: ProductSort,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for catalog rows.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Subcategories of a category, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_subcategories(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subcategory>, RepositoryError> {
        let subcategories = sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name, slug FROM subcategories \
             WHERE category_id = $1 ORDER BY name ASC",
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(subcategories)
    }

    /// Product listing with the storefront's filter set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN subcategories s ON s.id = p.subcategory_id \
             JOIN categories c ON c.id = s.category_id \
             WHERE TRUE"
        ));

        if let Some(ref slug) = filter.category_slug {
            qb.push(" AND c.slug = ").push_bind(slug);
        }
        if let Some(ref slug) = filter.subcategory_slug {
            qb.push(" AND s.slug = ").push_bind(slug);
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND p.price <= ").push_bind(max);
        }
        if let Some(ref term) = filter.search {
            let pattern = format!("%{term}%");
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if filter.featured_only {
            qb.push(" AND p.featured");
        }

        qb.push(match filter.sort {
            ProductSort::Newest => " ORDER BY p.created_at DESC",
            ProductSort::PriceAsc => " ORDER BY p.price ASC",
            ProductSort::PriceDesc => " ORDER BY p.price DESC",
        });
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.offset);

        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok(products)
    }

    /// Product detail by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Products at or below their restock threshold (staff view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_low_stock(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             WHERE p.stock <= p.low_stock_threshold \
             ORDER BY p.stock ASC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Create a product (staff).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_product(
        &self,
        subcategory_id: SubcategoryId,
        name: &str,
        slug: &str,
        description: &str,
        price: Price,
        stock: i32,
        low_stock_threshold: i32,
        featured: bool,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (subcategory_id, name, slug, description, price, stock, \
                                   low_stock_threshold, featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCT_COLUMNS_BARE}"
        ))
        .bind(subcategory_id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(low_stock_threshold)
        .bind(featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product slug"))
    }

    /// Update a product's catalog fields (staff). Stock is deliberately
    /// not writable here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update_product(
        &self,
        id: ProductId,
        name: &str,
        description: &str,
        price: Price,
        low_stock_threshold: i32,
        featured: bool,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products \
             SET name = $2, description = $3, price = $4, low_stock_threshold = $5, \
                 featured = $6, updated_at = now() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS_BARE}"
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(low_stock_threshold)
        .bind(featured)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
