//! Postgres store backed by an sqlx pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CheckoutStore, StoreError, StoreResult, StorefrontStore};
use crate::domain::aggregates::{
    Address, CartLine, Category, NewAddress, NewOrderLine, Order, OrderLine, OrderStatus, OrderWithLines, Page,
    PaymentMethod, PaymentStatus, Product, ProductQuery, ProductSnapshot, WishlistAdd, WishlistItem,
};
use crate::domain::value_objects::{Money, PaymentReference};

const PAYMENT_REFERENCE_CONSTRAINT: &str = "orders_payment_reference_key";

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[derive(sqlx::FromRow)]
struct CartLineRow { product_id: Uuid, quantity: i32, size: Option<String> }

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self { CartLine { product_id: r.product_id, quantity: r.quantity, size: r.size } }
}

#[derive(sqlx::FromRow)]
struct ProductRow { id: Uuid, name: String, price: Option<Decimal>, image_url: Option<String> }

impl From<ProductRow> for ProductSnapshot {
    fn from(r: ProductRow) -> Self {
        ProductSnapshot { product_id: r.id, name: r.name, unit_price: Money::from_price(r.price), image_url: r.image_url }
    }
}

#[derive(sqlx::FromRow)]
struct CatalogProductRow { id: Uuid, category_id: Option<Uuid>, name: String, price: Option<Decimal>, image_url: Option<String>, created_at: DateTime<Utc> }

impl From<CatalogProductRow> for Product {
    fn from(r: CatalogProductRow) -> Self {
        Product { id: r.id, category_id: r.category_id, name: r.name, price: Money::from_price(r.price), image_url: r.image_url, created_at: r.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow { id: Uuid, name: String, slug: String, created_at: DateTime<Utc> }

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self { Category { id: r.id, name: r.name, slug: r.slug, created_at: r.created_at } }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    qb.push(" WHERE TRUE");
    if let Some(category) = query.category {
        qb.push(" AND category_id = ").push_bind(category);
    }
    if let Some(search) = &query.search {
        let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        qb.push(" AND name ILIKE ").push_bind(format!("%{escaped}%"));
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: Uuid, user_id: Uuid, recipient_name: String, phone: String, line1: String, line2: Option<String>,
    city: String, state: String, pincode: String, is_default: bool,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Address {
            id: r.id, user_id: r.user_id, recipient_name: r.recipient_name, phone: r.phone, line1: r.line1,
            line2: r.line2, city: r.city, state: r.state, pincode: r.pincode, is_default: r.is_default,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, address_id: Uuid, amount: Decimal, payment_method: String,
    payment_status: Option<String>, payment_reference: Option<String>, status: String, created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let id = r.id;
        let corrupt = |e: &dyn std::fmt::Display| StoreError::Corrupt(format!("order {id}: {e}"));
        Ok(Order {
            id,
            user_id: r.user_id,
            address_id: r.address_id,
            amount: Money::new(r.amount),
            payment_method: r.payment_method.parse::<PaymentMethod>().map_err(|e| corrupt(&e))?,
            payment_status: r.payment_status.as_deref().map(str::parse::<PaymentStatus>).transpose().map_err(|e| corrupt(&e))?,
            payment_reference: r.payment_reference.map(PaymentReference::new).transpose().map_err(|e| corrupt(&e))?,
            status: r.status.parse::<OrderStatus>().map_err(|e| corrupt(&e))?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: Uuid, product_id: Uuid, name: String, unit_price: Decimal, quantity: i32,
    size: Option<String>, image_url: Option<String>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(r: OrderLineRow) -> Self {
        OrderLine {
            order_id: r.order_id, product_id: r.product_id, name: r.name, unit_price: Money::new(r.unit_price),
            quantity: r.quantity, size: r.size, image_url: r.image_url,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    product_id: Uuid, created_at: DateTime<Utc>, found_id: Option<Uuid>, name: Option<String>,
    price: Option<Decimal>, image_url: Option<String>,
}

impl From<WishlistRow> for WishlistItem {
    fn from(r: WishlistRow) -> Self {
        let product = r.found_id.map(|id| ProductSnapshot {
            product_id: id, name: r.name.unwrap_or_default(), unit_price: Money::from_price(r.price), image_url: r.image_url,
        });
        WishlistItem { product_id: r.product_id, created_at: r.created_at, product }
    }
}

#[async_trait]
impl CheckoutStore for PgStore {
    async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLineRow>("SELECT product_id, quantity, size FROM cart_items WHERE user_id = $1 ORDER BY created_at")
            .bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ProductSnapshot>> {
        if ids.is_empty() { return Ok(vec![]); }
        let rows = sqlx::query_as::<_, ProductRow>("SELECT id, name, price, image_url FROM products WHERE id = ANY($1)")
            .bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ProductSnapshot::from).collect())
    }

    async fn address(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Address>> {
        let row = sqlx::query_as::<_, AddressRow>("SELECT id, user_id, recipient_name, phone, line1, line2, city, state, pincode, is_default FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.map(Address::from))
    }

    async fn order_by_payment_reference(&self, reference: &PaymentReference) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT id, user_id, address_id, amount, payment_method, payment_status, payment_reference, status, created_at FROM orders WHERE payment_reference = $1")
            .bind(reference.as_str()).fetch_optional(&self.pool).await?;
        row.map(Order::try_from).transpose()
    }

    async fn place_order(&self, order: &Order, lines: Vec<NewOrderLine>) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO orders (id, user_id, address_id, amount, payment_method, payment_status, payment_reference, status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(order.id).bind(order.user_id).bind(order.address_id).bind(order.amount.amount())
            .bind(order.payment_method.as_str()).bind(order.payment_status.map(|s| s.as_str()))
            .bind(order.payment_reference.as_ref().map(|r| r.as_str())).bind(order.status.as_str()).bind(order.created_at)
            .execute(&mut *tx).await;
        if let (Err(sqlx::Error::Database(db)), Some(reference)) = (&inserted, &order.payment_reference) {
            if db.is_unique_violation() && db.constraint() == Some(PAYMENT_REFERENCE_CONSTRAINT) {
                return Err(StoreError::DuplicatePaymentReference(reference.clone()));
            }
        }
        inserted?;

        if !lines.is_empty() {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO order_items (order_id, line_no, product_id, name, unit_price, quantity, size, image_url) ");
            qb.push_values(lines.into_iter().enumerate(), |mut b, (i, line)| {
                b.push_bind(order.id).push_bind(i as i32).push_bind(line.product_id).push_bind(line.name)
                    .push_bind(line.unit_price.amount()).push_bind(line.quantity).push_bind(line.size).push_bind(line.image_url);
            });
            qb.build().execute(&mut *tx).await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(order.user_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(order.id)
    }
}

#[async_trait]
impl StorefrontStore for PgStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug, created_at FROM categories ORDER BY name").fetch_all(&self.pool).await?
            .into_iter().map(Category::from).collect())
    }

    async fn category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug, created_at FROM categories WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn products(&self, query: &ProductQuery) -> StoreResult<Page<Product>> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut list: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id, category_id, name, price, image_url, created_at FROM products");
        push_product_filters(&mut list, query);
        list.push(" ORDER BY created_at DESC, id LIMIT ").push_bind(i64::from(query.per_page))
            .push(" OFFSET ").push_bind(query.offset() as i64);
        let rows = list.build_query_as::<CatalogProductRow>().fetch_all(&self.pool).await?;
        Ok(Page { data: rows.into_iter().map(Product::from).collect(), total, page: query.page })
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, CatalogProductRow>("SELECT id, category_id, name, price, image_url, created_at FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn add_cart_line(&self, user_id: Uuid, line: CartLine) -> StoreResult<CartLine> {
        let row = sqlx::query_as::<_, CartLineRow>("INSERT INTO cart_items (user_id, product_id, quantity, size) VALUES ($1, $2, $3, $4) ON CONFLICT (user_id, product_id, (COALESCE(size, ''))) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity RETURNING product_id, quantity, size")
            .bind(user_id).bind(line.product_id).bind(line.quantity).bind(line.size)
            .fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, size: Option<&str>, quantity: i32) -> StoreResult<Option<CartLine>> {
        let row = sqlx::query_as::<_, CartLineRow>("UPDATE cart_items SET quantity = $4 WHERE user_id = $1 AND product_id = $2 AND COALESCE(size, '') = COALESCE($3, '') RETURNING product_id, quantity, size")
            .bind(user_id).bind(product_id).bind(size).bind(quantity)
            .fetch_optional(&self.pool).await?;
        Ok(row.map(CartLine::from))
    }

    async fn remove_cart_line(&self, user_id: Uuid, product_id: Uuid, size: Option<&str>) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2 AND COALESCE(size, '') = COALESCE($3, '')")
            .bind(user_id).bind(product_id).bind(size).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: Uuid) -> StoreResult<u64> {
        let done = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn addresses(&self, user_id: Uuid) -> StoreResult<Vec<Address>> {
        let rows = sqlx::query_as::<_, AddressRow>("SELECT id, user_id, recipient_name, phone, line1, line2, city, state, pincode, is_default FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at")
            .bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn insert_address(&self, user_id: Uuid, address: NewAddress) -> StoreResult<Address> {
        let address = Address::create(user_id, address);
        let mut tx = self.pool.begin().await?;
        if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
                .bind(user_id).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO addresses (id, user_id, recipient_name, phone, line1, line2, city, state, pincode, is_default) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(address.id).bind(user_id).bind(&address.recipient_name).bind(&address.phone).bind(&address.line1)
            .bind(&address.line2).bind(&address.city).bind(&address.state).bind(&address.pincode).bind(address.is_default)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn set_default_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Address>> {
        let mut tx = self.pool.begin().await?;
        let owned: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id).bind(user_id).fetch_optional(&mut *tx).await?;
        if owned.is_none() { return Ok(None); }
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND id <> $2 AND is_default")
            .bind(user_id).bind(id).execute(&mut *tx).await?;
        let row = sqlx::query_as::<_, AddressRow>("UPDATE addresses SET is_default = TRUE WHERE id = $1 RETURNING id, user_id, recipient_name, phone, line1, line2, city, state, pincode, is_default")
            .bind(id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2").bind(id).bind(user_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn wishlist(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
        let rows = sqlx::query_as::<_, WishlistRow>("SELECT w.product_id, w.created_at, p.id AS found_id, p.name, p.price, p.image_url FROM wishlist_items w LEFT JOIN products p ON p.id = w.product_id WHERE w.user_id = $1 ORDER BY w.created_at DESC")
            .bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(WishlistItem::from).collect())
    }

    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<WishlistAdd> {
        let done = sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) ON CONFLICT (user_id, product_id) DO NOTHING")
            .bind(user_id).bind(product_id).execute(&self.pool).await?;
        Ok(if done.rows_affected() == 0 { WishlistAdd::AlreadyPresent } else { WishlistAdd::Added })
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2").bind(user_id).bind(product_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT id, user_id, address_id, amount, payment_method, payment_status, payment_reference, status, created_at FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn order_with_lines(&self, user_id: Uuid, order_id: Uuid) -> StoreResult<Option<OrderWithLines>> {
        let Some(row) = sqlx::query_as::<_, OrderRow>("SELECT id, user_id, address_id, amount, payment_method, payment_status, payment_reference, status, created_at FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id).bind(user_id).fetch_optional(&self.pool).await?
        else { return Ok(None) };
        let lines = sqlx::query_as::<_, OrderLineRow>("SELECT order_id, product_id, name, unit_price, quantity, size, image_url FROM order_items WHERE order_id = $1 ORDER BY line_no")
            .bind(order_id).fetch_all(&self.pool).await?;
        Ok(Some(OrderWithLines { order: row.try_into()?, lines: lines.into_iter().map(OrderLine::from).collect() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(pool: &PgPool, price: i64) -> (Uuid, Uuid, Uuid) {
        let (user, product, address) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)").bind(user).bind(format!("{user}@example.com")).execute(pool).await.unwrap();
        sqlx::query("INSERT INTO products (id, name, price) VALUES ($1, 'Kurta', $2)").bind(product).bind(Decimal::new(price, 0)).execute(pool).await.unwrap();
        sqlx::query("INSERT INTO addresses (id, user_id, recipient_name, phone, line1, city, state, pincode) VALUES ($1, $2, 'A', '9999999999', 'L1', 'Pune', 'MH', '411001')")
            .bind(address).bind(user).execute(pool).await.unwrap();
        (user, product, address)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn test_place_order_is_atomic_and_clears_cart(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user, product, address) = seed(store.pool(), 250).await;
        store.add_cart_line(user, CartLine { product_id: product, quantity: 2, size: None }).await.unwrap();

        let lines = store.cart_lines(user).await.unwrap();
        let products = store.products_by_ids(&[product]).await.unwrap();
        let snapshot = crate::domain::aggregates::CartSnapshot::assemble(lines, products);
        let order = Order::cash_on_delivery(user, address, snapshot.subtotal());
        let id = store.place_order(&order, snapshot.to_order_lines()).await.unwrap();

        assert!(store.cart_lines(user).await.unwrap().is_empty());
        let saved = store.order_with_lines(user, id).await.unwrap().unwrap();
        assert_eq!(saved.order.amount.amount(), Decimal::new(500, 0));
        assert_eq!(saved.lines.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn test_duplicate_payment_reference_is_reported(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user, _, address) = seed(store.pool(), 10).await;
        let reference = PaymentReference::new("pi_dup").unwrap();
        let first = Order::paid_through_gateway(user, address, Money::ZERO, reference.clone());
        store.place_order(&first, vec![]).await.unwrap();
        let second = Order::paid_through_gateway(user, address, Money::ZERO, reference.clone());
        assert!(matches!(store.place_order(&second, vec![]).await, Err(StoreError::DuplicatePaymentReference(r)) if r == reference));
        assert_eq!(store.order_by_payment_reference(&reference).await.unwrap().unwrap().id, first.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn test_cart_lines_merge_by_product_and_size(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user, product, _) = seed(store.pool(), 10).await;
        store.add_cart_line(user, CartLine { product_id: product, quantity: 1, size: None }).await.unwrap();
        let merged = store.add_cart_line(user, CartLine { product_id: product, quantity: 2, size: None }).await.unwrap();
        assert_eq!(merged.quantity, 3);
        store.add_cart_line(user, CartLine { product_id: product, quantity: 1, size: Some("L".into()) }).await.unwrap();
        assert_eq!(store.cart_lines(user).await.unwrap().len(), 2);
        assert!(store.remove_cart_line(user, product, Some("L")).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn test_one_default_address(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user, _, first) = seed(store.pool(), 10).await;
        store.set_default_address(user, first).await.unwrap().unwrap();
        let second = store.insert_address(user, NewAddress {
            recipient_name: "B".into(), phone: "8888888888".into(), line1: "L2".into(), line2: None,
            city: "Pune".into(), state: "MH".into(), pincode: "411002".into(), is_default: true,
        }).await.unwrap();
        let all = store.addresses(user).await.unwrap();
        assert_eq!(all.iter().filter(|a| a.is_default).count(), 1);
        assert_eq!(all[0].id, second.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn test_wishlist_deduplicates(pool: PgPool) {
        let store = PgStore::new(pool);
        let (user, product, _) = seed(store.pool(), 10).await;
        assert_eq!(store.add_to_wishlist(user, product).await.unwrap(), WishlistAdd::Added);
        assert_eq!(store.add_to_wishlist(user, product).await.unwrap(), WishlistAdd::AlreadyPresent);
        assert_eq!(store.wishlist(user).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn test_product_listing_filters_and_pages(pool: PgPool) {
        let store = PgStore::new(pool);
        let ethnic = Uuid::new_v4();
        sqlx::query("INSERT INTO categories (id, name, slug) VALUES ($1, 'Ethnic', 'ethnic')").bind(ethnic).execute(store.pool()).await.unwrap();
        for (name, category) in [("Linen Kurta", Some(ethnic)), ("Silk Kurta", Some(ethnic)), ("Kurta_Set", None), ("Saree", Some(ethnic))] {
            sqlx::query("INSERT INTO products (id, category_id, name, price) VALUES ($1, $2, $3, 100)")
                .bind(Uuid::new_v4()).bind(category).bind(name).execute(store.pool()).await.unwrap();
        }

        let page = store.products(&ProductQuery::new(Some(ethnic), Some("kurta".into()), Some(1), Some(1))).await.unwrap();
        assert_eq!((page.total, page.data.len()), (2, 1));
        let literal = store.products(&ProductQuery::new(None, Some("a_s".into()), None, None)).await.unwrap();
        assert_eq!(literal.total, 1);
        assert_eq!(store.categories().await.unwrap()[0].slug, "ethnic");
    }
}
