//! Category repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::warn;
use uuid::Uuid;

use toolshare_core::{
    new_v7, slugify, AttributeDataType, AttributeDefinition, Category, CategoryAttribute,
    CategoryStore, CreateCategoryRequest, Error, Result, UpdateCategoryRequest, ValidationRules,
};

/// Standard SELECT columns for the category table.
const CATEGORY_COLUMNS: &str = r#"
    c.id, c.name, c.slug, c.parent_id, c.icon, c.color, c.sort_order,
    c.is_active, c.metadata, c.created_at, c.updated_at
"#;

/// PostgreSQL implementation of CategoryStore.
#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    /// Create a new PgCategoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_category(row: &PgRow) -> Category {
        Category {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            parent_id: row.get("parent_id"),
            icon: row.get("icon"),
            color: row.get("color"),
            sort_order: row.get("sort_order"),
            is_active: row.get("is_active"),
            metadata: row
                .get::<Option<serde_json::Value>, _>("metadata")
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn row_to_attribute(row: &PgRow) -> Option<CategoryAttribute> {
        let attribute_id: Uuid = row.get("attribute_id");
        let data_type_raw: String = row.get("data_type");
        let data_type = match data_type_raw.parse::<AttributeDataType>() {
            Ok(t) => t,
            Err(e) => {
                // Rows with unknown types are skipped so one bad definition
                // does not block validation of the rest.
                warn!(
                    subsystem = "database",
                    component = "categories",
                    attribute_id = %attribute_id,
                    error = %e,
                    "Skipping attribute definition with unknown data type"
                );
                return None;
            }
        };
        let rules: ValidationRules = match row
            .get::<Option<serde_json::Value>, _>("validation_rules")
        {
            None => ValidationRules::default(),
            Some(raw) => match serde_json::from_value(raw) {
                Ok(rules) => rules,
                Err(e) => {
                    // Defaulting would drop the constraints silently.
                    warn!(
                        subsystem = "database",
                        component = "categories",
                        attribute_id = %attribute_id,
                        error = %e,
                        "Skipping attribute definition with malformed validation rules"
                    );
                    return None;
                }
            },
        };

        Some(CategoryAttribute {
            category_id: row.get("category_id"),
            definition: AttributeDefinition {
                id: attribute_id,
                name: row.get("name"),
                label: row.get("label"),
                data_type,
                rules,
                has_options: row.get("has_options"),
            },
            is_required: row.get("is_required"),
            display_order: row.get("display_order"),
        })
    }
}

#[async_trait]
impl CategoryStore for PgCategoryRepository {
    async fn list_active(&self) -> Result<Vec<Category>> {
        let query = format!(
            r#"
            SELECT {}
            FROM category c
            WHERE c.is_active = TRUE
            ORDER BY c.sort_order NULLS LAST, c.name
            "#,
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::row_to_category).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>> {
        let query = format!("SELECT {} FROM category c WHERE c.id = $1", CATEGORY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::row_to_category))
    }

    async fn category_attributes(&self, category_id: Uuid) -> Result<Vec<CategoryAttribute>> {
        let rows = sqlx::query(
            r#"
            SELECT ca.category_id, ca.is_required, ca.display_order,
                   ad.id AS attribute_id, ad.name, ad.label, ad.data_type,
                   ad.validation_rules, ad.has_options
            FROM category_attribute ca
            JOIN attribute_definition ad ON ad.id = ca.attribute_id
            WHERE ca.category_id = $1
            ORDER BY ca.display_order, ad.name
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().filter_map(Self::row_to_attribute).collect())
    }

    async fn insert(&self, req: CreateCategoryRequest) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = self.insert_tx(&mut tx, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, req: UpdateCategoryRequest) -> Result<()> {
        // $1 = now, $2 = id, then dynamic params start at $3
        let mut updates: Vec<String> = vec!["updated_at = $1".to_string()];
        let mut param_idx = 3;

        if req.name.is_some() {
            updates.push(format!("name = ${}", param_idx));
            param_idx += 1;
        }
        if req.slug.is_some() {
            updates.push(format!("slug = ${}", param_idx));
            param_idx += 1;
        }
        if req.icon.is_some() {
            updates.push(format!("icon = ${}", param_idx));
            param_idx += 1;
        }
        if req.color.is_some() {
            updates.push(format!("color = ${}", param_idx));
            param_idx += 1;
        }
        if req.sort_order.is_some() {
            updates.push(format!("sort_order = ${}", param_idx));
            param_idx += 1;
        }
        if req.metadata.is_some() {
            updates.push(format!(
                "metadata = COALESCE(metadata, '{{}}'::jsonb) || ${}",
                param_idx
            ));
        }

        let query = format!("UPDATE category SET {} WHERE id = $2", updates.join(", "));

        let mut q = sqlx::query(&query).bind(Utc::now()).bind(id);
        if let Some(name) = req.name {
            q = q.bind(name);
        }
        if let Some(slug) = req.slug {
            q = q.bind(slugify(&slug));
        }
        if let Some(icon) = req.icon {
            q = q.bind(icon);
        }
        if let Some(color) = req.color {
            q = q.bind(color);
        }
        if let Some(sort_order) = req.sort_order {
            q = q.bind(sort_order);
        }
        if let Some(metadata) = req.metadata {
            q = q.bind(metadata);
        }

        let result = q.execute(&self.pool).await.map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::CategoryNotFound(id));
        }
        Ok(())
    }

    async fn set_parent(&self, id: Uuid, parent_id: Option<Uuid>) -> Result<()> {
        let result =
            sqlx::query("UPDATE category SET parent_id = $1, updated_at = $2 WHERE id = $3")
                .bind(parent_id)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::CategoryNotFound(id));
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        let result =
            sqlx::query("UPDATE category SET is_active = $1, updated_at = $2 WHERE id = $3")
                .bind(is_active)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::CategoryNotFound(id));
        }
        Ok(())
    }

    async fn count_items(&self, id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM item WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("n"))
    }
}

/// Transaction-aware variants.
impl PgCategoryRepository {
    /// Insert a category within an existing transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        req: CreateCategoryRequest,
    ) -> Result<Uuid> {
        let id = new_v7();
        let now = Utc::now();
        let slug = slugify(req.slug.as_deref().unwrap_or(&req.name));
        if slug.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Category name '{}' produces an empty slug",
                req.name
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO category (
                id, name, slug, parent_id, icon, color, sort_order,
                is_active, metadata, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9, $9)
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&slug)
        .bind(req.parent_id)
        .bind(&req.icon)
        .bind(&req.color)
        .bind(req.sort_order)
        .bind(req.metadata.unwrap_or_else(|| serde_json::json!({})))
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    /// Bind an attribute definition to a category, creating or replacing the binding.
    pub async fn attach_attribute(
        &self,
        category_id: Uuid,
        attribute_id: Uuid,
        is_required: bool,
        display_order: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO category_attribute (category_id, attribute_id, is_required, display_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (category_id, attribute_id)
            DO UPDATE SET is_required = EXCLUDED.is_required,
                          display_order = EXCLUDED.display_order
            "#,
        )
        .bind(category_id)
        .bind(attribute_id)
        .bind(is_required)
        .bind(display_order)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Store a reusable attribute definition.
    pub async fn insert_definition(&self, definition: &AttributeDefinition) -> Result<Uuid> {
        let rules = serde_json::to_value(&definition.rules)?;
        sqlx::query(
            r#"
            INSERT INTO attribute_definition (id, name, label, data_type, validation_rules, has_options)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(definition.id)
        .bind(&definition.name)
        .bind(&definition.label)
        .bind(definition.data_type.to_string())
        .bind(rules)
        .bind(definition.has_options)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(definition.id)
    }
}
