use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    AccountId, AccountRecord, Money, OrderId, OrderLineRecord, OrderQuery, OrderRecord, Page,
    ProductId, ProductRecord, Result, StoreError, Version,
    store::{ChangeSet, OrderWrite, StockWrite, Store, validate_change_set},
};

const ORDER_COLUMNS: &str = "id, owner_id, shipping_address, status, total_amount_cents, \
     created_at, created_by, updated_at, updated_by, version";

const PRODUCT_COLUMNS: &str =
    "id, name, base_price_cents, sale_rate, quantity, category_name, image_urls, version";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        Ok(ProductRecord {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            base_price: row
                .try_get::<Option<i64>, _>("base_price_cents")?
                .map(Money::from_cents),
            sale_rate: row.try_get("sale_rate")?,
            quantity: to_u32("products.quantity", row.try_get("quantity")?)?,
            category_name: row.try_get("category_name")?,
            image_urls: row.try_get("image_urls")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_account(row: PgRow) -> Result<AccountRecord> {
        let role: String = row.try_get("role")?;
        Ok(AccountRecord {
            id: AccountId::from_uuid(row.try_get::<Uuid, _>("id")?),
            email: row.try_get("email")?,
            role: role.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLineRecord> {
        Ok(OrderLineRecord {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: to_u32("order_lines.quantity", row.try_get("quantity")?)?,
            price_at_purchase: Money::from_cents(row.try_get("price_at_purchase_cents")?),
            product_type: row.try_get("product_type")?,
        })
    }

    fn row_to_order(row: PgRow, lines: Vec<OrderLineRecord>) -> Result<OrderRecord> {
        let status: String = row.try_get("status")?;
        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner: AccountId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            shipping_address: row.try_get("shipping_address")?,
            status: status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            lines,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            created_by: row.try_get("created_by")?,
            updated_at: row.try_get("updated_at")?,
            updated_by: row.try_get("updated_by")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    /// Loads the lines of several orders, grouped by order and kept in line order.
    async fn load_lines(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderLineRecord>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, price_at_purchase_cents, product_type
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderLineRecord>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id")?;
            grouped
                .entry(order_id)
                .or_default()
                .push(Self::row_to_line(&row)?);
        }
        Ok(grouped)
    }

    async fn apply_stock_write(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        write: &StockWrite,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET quantity = $1, version = version + 1 WHERE id = $2 AND version = $3",
        )
        .bind(i64::from(write.quantity))
        .bind(write.product_id.as_uuid())
        .bind(write.expected_version.as_i64())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM products WHERE id = $1")
            .bind(write.product_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Err(match actual {
            Some(actual) => StoreError::ConcurrencyConflict {
                entity: "product",
                id: write.product_id.to_string(),
                expected: write.expected_version,
                actual: Version::new(actual),
            },
            None => StoreError::MissingRecord {
                entity: "product",
                id: write.product_id.to_string(),
            },
        })
    }

    async fn apply_order_write(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        write: &OrderWrite,
    ) -> Result<()> {
        let order = &write.order;

        let affected = if write.is_insert() {
            sqlx::query(
                r#"
                INSERT INTO orders (id, owner_id, shipping_address, status, total_amount_cents,
                                    created_at, created_by, updated_at, updated_by, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(order.owner.as_uuid())
            .bind(&order.shipping_address)
            .bind(order.status.as_str())
            .bind(order.total_amount.cents())
            .bind(order.created_at)
            .bind(&order.created_by)
            .bind(order.updated_at)
            .bind(&order.updated_by)
            .bind(order.version.as_i64())
            .execute(&mut **tx)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                r#"
                UPDATE orders
                SET status = $1, updated_at = $2, updated_by = $3, version = $4
                WHERE id = $5 AND version = $6
                "#,
            )
            .bind(order.status.as_str())
            .bind(order.updated_at)
            .bind(&order.updated_by)
            .bind(order.version.as_i64())
            .bind(order.id.as_uuid())
            .bind(write.expected_version.as_i64())
            .execute(&mut **tx)
            .await?
            .rows_affected()
        };

        if affected != 1 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                    .bind(order.id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await?;
            return Err(StoreError::ConcurrencyConflict {
                entity: "order",
                id: order.id.to_string(),
                expected: write.expected_version,
                actual: Version::new(actual.unwrap_or(0)),
            });
        }

        if write.is_insert() {
            for (line_no, line) in order.lines.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_lines (order_id, line_no, product_id, quantity,
                                             price_at_purchase_cents, product_type)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(order.id.as_uuid())
                .bind(line_no as i32)
                .bind(line.product_id.as_uuid())
                .bind(i64::from(line.quantity))
                .bind(line.price_at_purchase.cents())
                .bind(&line.product_type)
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }
}

fn to_u32(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

#[async_trait]
impl Store for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<ProductRecord>> {
        let uuids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn save_product(&self, product: ProductRecord) -> Result<ProductRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products ({PRODUCT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                base_price_cents = EXCLUDED.base_price_cents,
                sale_rate = EXCLUDED.sale_rate,
                quantity = EXCLUDED.quantity,
                category_name = EXCLUDED.category_name,
                image_urls = EXCLUDED.image_urls,
                version = products.version + 1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.base_price.map(|p| p.cents()))
        .bind(product.sale_rate)
        .bind(i64::from(product.quantity))
        .bind(&product.category_name)
        .bind(&product.image_urls)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        let row = sqlx::query("SELECT id, email, role FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn save_account(&self, account: AccountRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                role = EXCLUDED.role
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(account.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_accounts(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut lines = self.load_lines(&[id.as_uuid()]).await?;
        let lines = lines.remove(&id.as_uuid()).unwrap_or_default();
        Self::row_to_order(row, lines).map(Some)
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Page<OrderRecord>> {
        let mut filter = String::from(" WHERE 1=1");
        let mut param_count = 0;

        if query.owner.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND owner_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND status = ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM orders{filter}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(owner) = query.owner {
            count_query = count_query.bind(owner.as_uuid());
        }
        if let Some(status) = query.status {
            count_query = count_query.bind(status.as_str());
        }
        let total_count = count_query.fetch_one(&self.pool).await?;

        let page_sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders{filter} ORDER BY created_at DESC, id ASC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        );
        let mut page_query = sqlx::query(&page_sql);
        if let Some(owner) = query.owner {
            page_query = page_query.bind(owner.as_uuid());
        }
        if let Some(status) = query.status {
            page_query = page_query.bind(status.as_str());
        }
        let rows = page_query
            .bind(i64::try_from(query.size).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut lines = self.load_lines(&ids).await?;

        let items = rows
            .into_iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page: query.page,
            size: query.size,
            total_count: total_count as u64,
        })
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        validate_change_set(&changes)?;

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        for write in &changes.stock {
            Self::apply_stock_write(&mut tx, write).await?;
        }
        if let Some(write) = &changes.order {
            Self::apply_order_write(&mut tx, write).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            stock_writes = changes.stock.len(),
            order_write = changes.order.is_some(),
            "Change set committed"
        );
        Ok(())
    }
}
