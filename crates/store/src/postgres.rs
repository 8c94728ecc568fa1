use async_trait::async_trait;
use common::{AddressId, OrderId, OwnerId, ProductId};
use domain::{
    Address, AddressKind, Category, Favorite, Money, Order, OrderState, OrderTransition,
    PaymentMethod, PaymentState, Product,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ProductFilter, Result, StoreError,
    store::{AddressStore, FavoriteStore, OrderStore, ProductCatalog},
};

/// PostgreSQL-backed store implementation.
///
/// Multi-step invariants run inside transactions; state transitions are a
/// single conditional `UPDATE` whose `WHERE` clause mirrors
/// [`OrderTransition::guard`], so the compare-and-set happens in the
/// database rather than in the handler.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_address(row: &PgRow) -> Result<Address> {
        let kind_name: String = row.try_get("kind")?;
        let kind = AddressKind::parse(&kind_name).ok_or_else(|| {
            StoreError::DataCorruption(format!("unknown address kind {kind_name:?}"))
        })?;

        Ok(Address {
            id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: OwnerId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            kind,
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            region: row.try_get("region")?,
            postal_code: row.try_get("postal_code")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let payment_method_name: String = row.try_get("payment_method")?;
        let payment_method = PaymentMethod::parse(&payment_method_name).ok_or_else(|| {
            StoreError::DataCorruption(format!("unknown payment method {payment_method_name:?}"))
        })?;

        let payment_state_name: String = row.try_get("payment_state")?;
        let payment_state = PaymentState::parse(&payment_state_name).ok_or_else(|| {
            StoreError::DataCorruption(format!("unknown payment state {payment_state_name:?}"))
        })?;

        let order_state_name: String = row.try_get("order_state")?;
        let order_state = OrderState::parse(&order_state_name).ok_or_else(|| {
            StoreError::DataCorruption(format!("unknown order state {order_state_name:?}"))
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: OwnerId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            line_items: serde_json::from_value(row.try_get("line_items")?)?,
            total_amount: Money::from_paise(row.try_get("total_paise")?),
            shipping_address: serde_json::from_value(row.try_get("shipping_address")?)?,
            payment_method,
            payment_state,
            order_state,
            gateway_session_id: row.try_get("gateway_session_id")?,
            gateway_payment_ref: row.try_get("gateway_payment_ref")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        let category_name: String = row.try_get("category")?;
        let category = Category::parse(&category_name).ok_or_else(|| {
            StoreError::DataCorruption(format!("unknown category {category_name:?}"))
        })?;

        let stock: i32 = row.try_get("stock")?;

        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            pricing: serde_json::from_value(row.try_get("pricing")?)?,
            image: row.try_get("image")?,
            category,
            stock: stock.max(0) as u32,
            brand: row.try_get("brand")?,
            is_featured: row.try_get("is_featured")?,
        })
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn list_addresses(&self, owner: OwnerId) -> Result<Vec<Address>> {
        let rows = sqlx::query(
            "SELECT * FROM addresses WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_address).collect()
    }

    async fn insert_address(&self, mut address: Address) -> Result<Address> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE owner_id = $1")
            .bind(address.owner_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        // First address is always the default; otherwise a requested default
        // displaces the current one inside the same transaction.
        if existing == 0 {
            address.is_default = true;
        } else if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner_id = $1 AND is_default")
                .bind(address.owner_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO addresses (id, owner_id, kind, street, city, region, postal_code, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.owner_id.as_uuid())
        .bind(address.kind.as_str())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(address.is_default)
        .bind(address.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    async fn get_address(&self, owner: OwnerId, id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query("SELECT * FROM addresses WHERE id = $1 AND owner_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_address).transpose()
    }

    async fn delete_address(&self, owner: OwnerId, id: AddressId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM addresses WHERE id = $1 AND owner_id = $2 RETURNING is_default",
        )
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls back, so the early return is safe.
        let Some(row) = deleted else {
            return Err(StoreError::NotFound);
        };

        if row.try_get::<bool, _>("is_default")? {
            sqlx::query(
                r#"
                UPDATE addresses SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM addresses
                    WHERE owner_id = $1
                    ORDER BY created_at DESC
                    LIMIT 1
                )
                "#,
            )
            .bind(owner.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_default_address(&self, owner: OwnerId, id: AddressId) -> Result<Address> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner_id = $1 AND is_default")
            .bind(owner.as_uuid())
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            "UPDATE addresses SET is_default = TRUE WHERE id = $1 AND owner_id = $2 RETURNING *",
        )
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        // An unknown or foreign id rolls the clear back with the drop.
        let Some(row) = row else {
            return Err(StoreError::NotFound);
        };

        tx.commit().await?;
        Self::row_to_address(&row)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, owner_id, line_items, total_paise, shipping_address,
                                payment_method, payment_state, order_state,
                                gateway_session_id, gateway_payment_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.owner_id.as_uuid())
        .bind(serde_json::to_value(&order.line_items)?)
        .bind(order.total_amount.paise())
        .bind(serde_json::to_value(&order.shipping_address)?)
        .bind(order.payment_method.as_str())
        .bind(order.payment_state.as_str())
        .bind(order.order_state.as_str())
        .bind(&order.gateway_session_id)
        .bind(&order.gateway_payment_ref)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, owner: OwnerId, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1 AND owner_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, owner: OwnerId) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT * FROM orders WHERE owner_id = $1 ORDER BY created_at DESC")
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn latest_order(&self, owner: OwnerId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT * FROM orders WHERE owner_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(owner.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn find_by_gateway_session(&self, session_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE gateway_session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn claim_gateway_session(&self, id: OrderId, session_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET gateway_session_id = $2 WHERE id = $1 AND gateway_session_id IS NULL",
        )
        .bind(id.as_uuid())
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(false)
    }

    async fn apply_transition(
        &self,
        id: OrderId,
        transition: &OrderTransition,
    ) -> Result<Option<Order>> {
        // Each WHERE clause mirrors OrderTransition::guard, so the guard and
        // the write are one atomic statement.
        let row = match transition {
            OrderTransition::PaymentCaptured { payment_ref } => {
                sqlx::query(
                    r#"
                    UPDATE orders
                    SET payment_state = 'completed', order_state = 'processing',
                        gateway_payment_ref = $2
                    WHERE id = $1 AND payment_state = 'pending' AND order_state = 'pending'
                    RETURNING *
                    "#,
                )
                .bind(id.as_uuid())
                .bind(payment_ref)
                .fetch_optional(&self.pool)
                .await?
            }
            OrderTransition::PaymentFailed => {
                sqlx::query(
                    r#"
                    UPDATE orders
                    SET payment_state = 'failed'
                    WHERE id = $1 AND payment_state = 'pending' AND order_state = 'pending'
                    RETURNING *
                    "#,
                )
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
            OrderTransition::Cancel => {
                sqlx::query(
                    r#"
                    UPDATE orders
                    SET order_state = 'cancelled'
                    WHERE id = $1 AND order_state IN ('pending', 'confirmed')
                    RETURNING *
                    "#,
                )
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        if let Some(row) = row {
            return Ok(Some(Self::row_to_order(&row)?));
        }

        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(%id, "transition lost the compare-and-set");
        Ok(None)
    }
}

#[async_trait]
impl ProductCatalog for PostgresStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, pricing, image, category, stock, brand, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(serde_json::to_value(&product.pricing)?)
        .bind(&product.image)
        .bind(product.category.as_str())
        .bind(product.stock as i32)
        .bind(&product.brand)
        .bind(product.is_featured)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut sql = String::from("SELECT * FROM products WHERE TRUE");
        let mut bind_index = 0;

        if filter.category.is_some() {
            bind_index += 1;
            sql.push_str(&format!(" AND category = ${bind_index}"));
        }
        if filter.search.is_some() {
            bind_index += 1;
            sql.push_str(&format!(
                " AND (name ILIKE ${bind_index} OR description ILIKE ${bind_index} OR brand ILIKE ${bind_index})"
            ));
        }
        sql.push_str(" ORDER BY name");

        let mut query = sqlx::query(&sql);
        if let Some(category) = filter.category {
            query = query.bind(category.as_str());
        }
        if let Some(ref term) = filter.search {
            query = query.bind(format!("%{term}%"));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_product).collect()
    }

    async fn related_products(&self, id: ProductId, limit: usize) -> Result<Vec<Product>> {
        let category: Option<String> =
            sqlx::query_scalar("SELECT category FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        let Some(category) = category else {
            return Err(StoreError::NotFound);
        };

        let rows = sqlx::query(
            "SELECT * FROM products WHERE category = $1 AND id <> $2 ORDER BY id LIMIT $3",
        )
        .bind(&category)
        .bind(id.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl FavoriteStore for PostgresStore {
    async fn list_favorites(&self, owner: OwnerId) -> Result<Vec<Favorite>> {
        let rows = sqlx::query(
            "SELECT * FROM favorites WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Favorite {
                    owner_id: OwnerId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn add_favorite(&self, favorite: Favorite) -> Result<()> {
        sqlx::query(
            "INSERT INTO favorites (owner_id, product_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(favorite.owner_id.as_uuid())
        .bind(favorite.product_id.as_uuid())
        .bind(favorite.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("already in favorites".to_owned());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn remove_favorite(&self, owner: OwnerId, product: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE owner_id = $1 AND product_id = $2")
            .bind(owner.as_uuid())
            .bind(product.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
