//! Catalog: categories, products and their addon group links

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{AddonGroupWithAddons, Category, Product};
use shared::validation::{validate_price, validate_required};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::seed_default_categories;
use crate::services::order::linked_addon_groups;
use crate::services::realtime::{ChangeAction, RealtimeHub};
use crate::services::subscription::plan_limits;

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
    realtime: RealtimeHub,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub position: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub promotional_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub promotional_price: Option<Decimal>,
    /// Set to true to remove the promotional price
    #[serde(default)]
    pub clear_promotion: bool,
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LinkAddonGroupInput {
    pub group_id: Uuid,
    pub position: Option<i32>,
}

fn validate_prices(price: Option<Decimal>, promotional_price: Option<Decimal>) -> AppResult<()> {
    if let Some(price) = price {
        validate_price(price).map_err(|m| AppError::field("price", m))?;
    }
    if let Some(promo) = promotional_price {
        validate_price(promo).map_err(|m| AppError::field("promotional_price", m))?;
    }
    Ok(())
}

impl CatalogService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self, establishment_id: Uuid) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE establishment_id = $1 ORDER BY position, name",
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    pub async fn create_category(&self, establishment_id: Uuid, input: CreateCategoryInput) -> AppResult<Category> {
        validate_required(&input.name).map_err(|m| AppError::field("name", m))?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (establishment_id, name, position)
            VALUES ($1, $2, COALESCE($3, (SELECT COALESCE(MAX(position), 0) + 1 FROM categories WHERE establishment_id = $1)))
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "categories", ChangeAction::Insert, category.id);
        Ok(category)
    }

    pub async fn update_category(
        &self,
        establishment_id: Uuid,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> AppResult<Category> {
        if let Some(name) = input.name.as_deref() {
            validate_required(name).map_err(|m| AppError::field("name", m))?;
        }

        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($3, name),
                position = COALESCE($4, position),
                is_active = COALESCE($5, is_active)
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(category_id)
        .bind(establishment_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.position)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        self.realtime.notify(establishment_id, "categories", ChangeAction::Update, category_id);
        Ok(category)
    }

    /// Delete a category that has no products
    pub async fn delete_category(&self, establishment_id: Uuid, category_id: Uuid) -> AppResult<()> {
        let products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE category_id = $1 AND establishment_id = $2",
        )
        .bind(category_id)
        .bind(establishment_id)
        .fetch_one(&self.db)
        .await?;

        if products > 0 {
            return Err(AppError::Conflict {
                resource: "category".to_string(),
                message: format!("Category still has {} products", products),
            });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND establishment_id = $2")
            .bind(category_id)
            .bind(establishment_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }

        self.realtime.notify(establishment_id, "categories", ChangeAction::Delete, category_id);
        Ok(())
    }

    /// Set positions following the given id order
    pub async fn reorder_categories(&self, establishment_id: Uuid, ordered_ids: &[Uuid]) -> AppResult<Vec<Category>> {
        let mut tx = self.db.begin().await?;
        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE categories SET position = $3 WHERE id = $1 AND establishment_id = $2")
                .bind(id)
                .bind(establishment_id)
                .bind(position as i32 + 1)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        for id in ordered_ids {
            self.realtime.notify(establishment_id, "categories", ChangeAction::Update, *id);
        }
        self.list_categories(establishment_id).await
    }

    /// Create the default categories that are missing
    pub async fn seed_default_categories(&self, establishment_id: Uuid) -> AppResult<Vec<Category>> {
        let mut conn = self.db.acquire().await?;
        let created = seed_default_categories(&mut conn, establishment_id).await?;
        drop(conn);

        tracing::info!(%establishment_id, created, "Default categories seeded");
        self.list_categories(establishment_id).await
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn list_products(&self, establishment_id: Uuid, category_id: Option<Uuid>) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE establishment_id = $1 AND ($2::uuid IS NULL OR category_id = $2)
            ORDER BY position, name
            "#,
        )
        .bind(establishment_id)
        .bind(category_id)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, establishment_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND establishment_id = $2")
            .bind(product_id)
            .bind(establishment_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Create a product within the plan product limit
    pub async fn create_product(&self, establishment_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        validate_required(&input.name).map_err(|m| AppError::field("name", m))?;
        validate_prices(Some(input.price), input.promotional_price)?;

        let mut tx = self.db.begin().await?;

        let limits = plan_limits(&mut tx, establishment_id).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE establishment_id = $1")
            .bind(establishment_id)
            .fetch_one(&mut *tx)
            .await?;
        if !limits.allows_products(count) {
            return Err(AppError::PlanLimitReached("products".to_string()));
        }

        if let Some(category_id) = input.category_id {
            self.ensure_category(&mut tx, establishment_id, category_id).await?;
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (establishment_id, category_id, name, description, price, promotional_price, image_url, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 0))
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.promotional_price)
        .bind(&input.image_url)
        .bind(input.position)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(%establishment_id, product_id = %product.id, "Product created");
        self.realtime.notify(establishment_id, "products", ChangeAction::Insert, product.id);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        establishment_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        if let Some(name) = input.name.as_deref() {
            validate_required(name).map_err(|m| AppError::field("name", m))?;
        }
        validate_prices(input.price, input.promotional_price)?;

        let mut tx = self.db.begin().await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(&mut tx, establishment_id, category_id).await?;
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                category_id = COALESCE($3, category_id),
                name = COALESCE($4, name),
                description = COALESCE($5, description),
                price = COALESCE($6, price),
                promotional_price = CASE WHEN $7 THEN NULL ELSE COALESCE($8, promotional_price) END,
                image_url = COALESCE($9, image_url),
                position = COALESCE($10, position),
                updated_at = NOW()
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(establishment_id)
        .bind(input.category_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(input.price)
        .bind(input.clear_promotion)
        .bind(input.promotional_price)
        .bind(&input.image_url)
        .bind(input.position)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        tx.commit().await?;

        self.realtime.notify(establishment_id, "products", ChangeAction::Update, product_id);
        Ok(product)
    }

    pub async fn delete_product(&self, establishment_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND establishment_id = $2")
            .bind(product_id)
            .bind(establishment_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        self.realtime.notify(establishment_id, "products", ChangeAction::Delete, product_id);
        Ok(())
    }

    pub async fn set_product_availability(
        &self,
        establishment_id: Uuid,
        product_id: Uuid,
        is_available: bool,
    ) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET is_available = $3, updated_at = NOW()
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(establishment_id)
        .bind(is_available)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        self.realtime.notify(establishment_id, "products", ChangeAction::Update, product_id);
        Ok(product)
    }

    // ------------------------------------------------------------------
    // Product addon groups
    // ------------------------------------------------------------------

    pub async fn product_addon_groups(
        &self,
        establishment_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<AddonGroupWithAddons>> {
        self.get_product(establishment_id, product_id).await?;
        let mut conn = self.db.acquire().await?;
        linked_addon_groups(&mut conn, product_id).await
    }

    pub async fn link_addon_group(
        &self,
        establishment_id: Uuid,
        product_id: Uuid,
        input: LinkAddonGroupInput,
    ) -> AppResult<Vec<AddonGroupWithAddons>> {
        self.get_product(establishment_id, product_id).await?;

        let group_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM addon_groups WHERE id = $1 AND establishment_id = $2)",
        )
        .bind(input.group_id)
        .bind(establishment_id)
        .fetch_one(&self.db)
        .await?;
        if !group_exists {
            return Err(AppError::NotFound("Addon group".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO product_addon_groups (product_id, group_id, position)
            VALUES ($1, $2, COALESCE($3, 0))
            ON CONFLICT (product_id, group_id) DO UPDATE SET position = EXCLUDED.position
            "#,
        )
        .bind(product_id)
        .bind(input.group_id)
        .bind(input.position)
        .execute(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "products", ChangeAction::Update, product_id);
        self.product_addon_groups(establishment_id, product_id).await
    }

    pub async fn unlink_addon_group(&self, establishment_id: Uuid, product_id: Uuid, group_id: Uuid) -> AppResult<()> {
        self.get_product(establishment_id, product_id).await?;

        let result = sqlx::query("DELETE FROM product_addon_groups WHERE product_id = $1 AND group_id = $2")
            .bind(product_id)
            .bind(group_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Addon group link".to_string()));
        }

        self.realtime.notify(establishment_id, "products", ChangeAction::Update, product_id);
        Ok(())
    }

    async fn ensure_category(
        &self,
        conn: &mut sqlx::PgConnection,
        establishment_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND establishment_id = $2)",
        )
        .bind(category_id)
        .bind(establishment_id)
        .fetch_one(&mut *conn)
        .await?;
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Category".to_string()))
        }
    }
}
