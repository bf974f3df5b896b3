use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use common::{
    AddressId, CartId, CartItemId, CategoryId, ProductId, ReviewId, UserId, WishItemId,
};
use sqlx::{
    PgConnection, PgPool, Row,
    postgres::{PgExecutor, PgPoolOptions, PgRow},
    types::Json,
};
use uuid::Uuid;

use crate::{
    Address, AddressUpdate, AuthToken, Cart, CartItem, Category, NewAddress, NewCartItem,
    NewProduct, NewReview, NewUser, Product, ProductQuery, Properties, Result, Review,
    ReviewQuery, StoreError, User, UserQuery, WishItem, constraints, query::order_by_clause,
    store::EntityStore,
};

const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.name, u.surname, u.password_hash, u.is_staff,
           u.created_at, u.updated_at,
           a.id AS address_id, a.country, a.city, a.street, a.house, a.postal_code
    FROM users u
    LEFT JOIN addresses a ON a.id = u.address_id
"#;

const PRODUCT_COLUMNS: &str = "id, name, description, brand, price, stock, rating, category_id, properties, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, rating, commentary, user_id, product_id, created_at, updated_at";

const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, created_at";

const WISH_ITEM_COLUMNS: &str = "id, user_id, product_id, created_at";

/// PostgreSQL-backed entity store implementation.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Creates a new PostgreSQL entity store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `url` and wraps it in a store.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let address = match row.try_get::<Option<Uuid>, _>("address_id")? {
            Some(id) => Some(Address {
                id: AddressId::from_uuid(id),
                country: row.try_get("country")?,
                city: row.try_get("city")?,
                street: row.try_get("street")?,
                house: row.try_get("house")?,
                postal_code: row.try_get("postal_code")?,
            }),
            None => None,
        };

        Ok(User {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            surname: row.try_get("surname")?,
            password_hash: row.try_get("password_hash")?,
            is_staff: row.try_get("is_staff")?,
            address,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_token(row: PgRow) -> Result<AuthToken> {
        Ok(AuthToken {
            key: row.try_get("key")?,
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_category(row: PgRow) -> Result<Category> {
        Ok(Category {
            id: CategoryId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let properties: Json<Properties> = row.try_get("properties")?;

        Ok(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            brand: row.try_get("brand")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            rating: row.try_get("rating")?,
            category_id: CategoryId::from_uuid(row.try_get("category_id")?),
            properties: properties.0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_review(row: PgRow) -> Result<Review> {
        Ok(Review {
            id: ReviewId::from_uuid(row.try_get("id")?),
            rating: row.try_get("rating")?,
            commentary: row.try_get("commentary")?,
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
        Ok(CartItem {
            id: CartItemId::from_uuid(row.try_get("id")?),
            cart_id: CartId::from_uuid(row.try_get("cart_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_wish_item(row: PgRow) -> Result<WishItem> {
        Ok(WishItem {
            id: WishItemId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Current time at the precision PostgreSQL stores, so returned records
/// compare equal to what a later read yields.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Translates constraint violations into store errors carrying the
/// constraint name.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(constraint) = db_err.constraint()
    {
        if db_err.is_unique_violation() {
            return StoreError::unique(constraint);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::foreign_key(constraint);
        }
    }
    StoreError::Database(e)
}

async fn load_user<'e, E>(executor: E, id: UserId) -> Result<Option<User>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(&format!("{USER_SELECT} WHERE u.id = $1"))
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await?;

    row.map(PostgresEntityStore::row_to_user).transpose()
}

async fn insert_address(conn: &mut PgConnection, address: NewAddress) -> Result<Uuid> {
    let id = AddressId::new();
    sqlx::query(
        r#"
        INSERT INTO addresses (id, country, city, street, house, postal_code)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id.as_uuid())
    .bind(&address.country)
    .bind(&address.city)
    .bind(&address.street)
    .bind(address.house)
    .bind(&address.postal_code)
    .execute(conn)
    .await?;
    Ok(id.as_uuid())
}

/// Locks a product row for the rest of the transaction.
///
/// Returns false if the product does not exist.
async fn lock_product(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(locked.is_some())
}

/// Rewrites a product's rating from its current reviews.
async fn recompute_rating(conn: &mut PgConnection, product_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET rating = COALESCE(
                (SELECT AVG(rating)::DOUBLE PRECISION FROM reviews WHERE product_id = $1),
                0
            ),
            updated_at = $2
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .bind(now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let created_at = now();
        let user = User {
            id: UserId::new(),
            email: new.email,
            name: new.name,
            surname: new.surname,
            password_hash: new.password_hash,
            is_staff: new.is_staff,
            address: None,
            created_at,
            updated_at: created_at,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, surname, password_hash, is_staff, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2)")
            .bind(CartId::new().as_uuid())
            .bind(user.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        load_user(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn list_users(&self, query: UserQuery) -> Result<Vec<User>> {
        // Wrapped so the ordering columns are unambiguous after the join.
        let sql = format!(
            "SELECT * FROM ({USER_SELECT}) AS listed{}",
            order_by_clause(&query.ordering)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn update_user(&self, user: &User, address: AddressUpdate) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT address_id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Err(StoreError::not_found("User", user.id));
        };

        let address_id = match address {
            AddressUpdate::Keep => previous,
            AddressUpdate::Clear => None,
            AddressUpdate::Replace(address) => Some(insert_address(&mut tx, address).await?),
        };

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, name = $3, surname = $4, password_hash = $5, address_id = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.password_hash)
        .bind(address_id)
        .bind(now())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if let Some(previous) = previous
            && address_id != Some(previous)
        {
            sqlx::query("DELETE FROM addresses WHERE id = $1")
                .bind(previous)
                .execute(&mut *tx)
                .await?;
        }

        let updated = load_user(&mut *tx, user.id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", user.id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let address: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT address_id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(address) = address else {
            return Ok(false);
        };

        // Lock in id order so concurrent review writers cannot deadlock us.
        let reviewed: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM products
            WHERE id IN (SELECT product_id FROM reviews WHERE user_id = $1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        if let Some(address) = address {
            sqlx::query("DELETE FROM addresses WHERE id = $1")
                .bind(address)
                .execute(&mut *tx)
                .await?;
        }

        for product_id in reviewed {
            recompute_rating(&mut tx, product_id).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn token_for_user(&self, user_id: UserId, candidate_key: String) -> Result<AuthToken> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("User", user_id));
        }

        sqlx::query(
            r#"
            INSERT INTO auth_tokens (key, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT auth_tokens_user_id_key DO NOTHING
            "#,
        )
        .bind(&candidate_key)
        .bind(user_id.as_uuid())
        .bind(now())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let row = sqlx::query("SELECT key, user_id, created_at FROM auth_tokens WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Self::row_to_token(row)
    }

    async fn find_token(&self, key: &str) -> Result<Option<AuthToken>> {
        let row = sqlx::query("SELECT key, user_id, created_at FROM auth_tokens WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_token).transpose()
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let category = Category {
            id: CategoryId::new(),
            name: name.to_string(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(now())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let row = sqlx::query("UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.as_uuid())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        match row {
            Some(row) => Self::row_to_category(row),
            None => Err(StoreError::not_found("Category", id)),
        }
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let created_at = now();
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            brand: new.brand,
            price: new.price,
            stock: new.stock,
            rating: 0.0,
            category_id: new.category_id,
            properties: new.properties,
            created_at,
            updated_at: created_at,
        };

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.rating)
        .bind(product.category_id.as_uuid())
        .bind(Json(&product.properties))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1");
        if query.category_ids.is_some() {
            sql.push_str(" AND category_id = ANY($1)");
        }
        sql.push_str(&order_by_clause(&query.ordering));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(ids) = &query.category_ids {
            let ids: Vec<Uuid> = ids.iter().map(CategoryId::as_uuid).collect();
            sqlx_query = sqlx_query.bind(ids);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, product: &Product) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, brand = $4, price = $5, stock = $6,
                category_id = $7, properties = $8, updated_at = $9
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id.as_uuid())
        .bind(Json(&product.properties))
        .bind(now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::not_found("Product", product.id)),
        }
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_review(&self, new: NewReview) -> Result<Review> {
        let created_at = now();
        let review = Review {
            id: ReviewId::new(),
            rating: new.rating,
            commentary: new.commentary,
            user_id: new.user_id,
            product_id: new.product_id,
            created_at,
            updated_at: created_at,
        };

        let mut tx = self.pool.begin().await?;

        if !lock_product(&mut tx, review.product_id.as_uuid()).await? {
            return Err(StoreError::foreign_key(constraints::REVIEW_PRODUCT_FK));
        }

        sqlx::query(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(review.id.as_uuid())
        .bind(review.rating)
        .bind(&review.commentary)
        .bind(review.user_id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        recompute_rating(&mut tx, review.product_id.as_uuid()).await?;

        tx.commit().await?;
        Ok(review)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_review).transpose()
    }

    async fn list_reviews(&self, query: ReviewQuery) -> Result<Vec<Review>> {
        let mut sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE 1=1");
        let mut param_count = 0;

        if query.product_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND product_id = ${param_count}"));
        }
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        sql.push_str(&order_by_clause(&query.ordering));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(id) = query.product_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(id) = query.user_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_review).collect()
    }

    async fn update_review(&self, review: &Review) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<Uuid> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
                .bind(review.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(product_id) = product_id else {
            return Err(StoreError::not_found("Review", review.id));
        };
        lock_product(&mut tx, product_id).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE reviews
            SET rating = $2, commentary = $3, updated_at = $4
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.id.as_uuid())
        .bind(review.rating)
        .bind(&review.commentary)
        .bind(now())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(StoreError::not_found("Review", review.id));
        };

        recompute_rating(&mut tx, product_id).await?;

        tx.commit().await?;
        Self::row_to_review(row)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<Uuid> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(product_id) = product_id else {
            return Ok(false);
        };
        lock_product(&mut tx, product_id).await?;

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        recompute_rating(&mut tx, product_id).await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, user_id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Cart {
                id: CartId::from_uuid(row.try_get("id")?),
                user_id: UserId::from_uuid(row.try_get("user_id")?),
            })),
            None => Ok(None),
        }
    }

    async fn add_cart_item(&self, new: NewCartItem) -> Result<CartItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items ({CART_ITEM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT cart_items_cart_product_key
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity <= 2147483647 - EXCLUDED.quantity
            RETURNING {CART_ITEM_COLUMNS}
            "#
        ))
        .bind(CartItemId::new().as_uuid())
        .bind(new.cart_id.as_uuid())
        .bind(new.product_id.as_uuid())
        .bind(new.quantity)
        .bind(now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        // The conflict branch skips the update when the sum would not fit.
        let row = row.ok_or(StoreError::OutOfRange { column: "quantity" })?;
        Self::row_to_cart_item(row)
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart_item).transpose()
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_item).collect()
    }

    async fn update_cart_item(&self, item: &CartItem) -> Result<CartItem> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE cart_items
            SET product_id = $2, quantity = $3
            WHERE id = $1
            RETURNING {CART_ITEM_COLUMNS}
            "#
        ))
        .bind(item.id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            Some(row) => Self::row_to_cart_item(row),
            None => Err(StoreError::not_found("CartItem", item.id)),
        }
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_wish_item(&self, user_id: UserId, product_id: ProductId) -> Result<WishItem> {
        let item = WishItem {
            id: WishItemId::new(),
            user_id,
            product_id,
            created_at: now(),
        };

        sqlx::query(&format!(
            "INSERT INTO wish_items ({WISH_ITEM_COLUMNS}) VALUES ($1, $2, $3, $4)"
        ))
        .bind(item.id.as_uuid())
        .bind(item.user_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(item)
    }

    async fn get_wish_item(&self, id: WishItemId) -> Result<Option<WishItem>> {
        let row = sqlx::query(&format!(
            "SELECT {WISH_ITEM_COLUMNS} FROM wish_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_wish_item).transpose()
    }

    async fn list_wish_items(&self, user_id: UserId) -> Result<Vec<WishItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {WISH_ITEM_COLUMNS} FROM wish_items WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_wish_item).collect()
    }

    async fn delete_wish_item(&self, id: WishItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wish_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
