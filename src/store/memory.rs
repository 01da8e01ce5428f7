//! In-memory store used by the service and router tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{CheckoutStore, StoreError, StoreResult, StorefrontStore};
use crate::domain::aggregates::{
    Address, CartLine, Category, NewAddress, NewOrderLine, Order, OrderLine, OrderWithLines, Page, Product, ProductQuery,
    ProductSnapshot, WishlistAdd, WishlistItem,
};
use crate::domain::value_objects::{Money, PaymentReference};

#[derive(Default)]
struct State {
    categories: Vec<Category>,
    products: HashMap<Uuid, Product>,
    addresses: Vec<Address>,
    cart: Vec<(Uuid, CartLine)>,
    wishlist: Vec<(Uuid, WishlistItem)>,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn put_product(&self, name: &str, price: Money) -> Uuid { self.put_product_in(name, price, None) }

    pub fn put_product_in(&self, name: &str, price: Money, category_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let product = Product { id, category_id, name: name.into(), price, image_url: Some(format!("{name}.png")), created_at: Utc::now() };
        self.state.lock().unwrap().products.insert(id, product);
        id
    }

    pub fn put_category(&self, name: &str) -> Uuid {
        let category = Category { id: Uuid::new_v4(), name: name.into(), slug: name.to_lowercase().replace(' ', "-"), created_at: Utc::now() };
        let id = category.id;
        self.state.lock().unwrap().categories.push(category);
        id
    }

    pub fn set_price(&self, id: Uuid, price: Money) {
        if let Some(p) = self.state.lock().unwrap().products.get_mut(&id) { p.price = price; }
    }

    pub fn delete_product(&self, id: Uuid) { self.state.lock().unwrap().products.remove(&id); }

    pub fn put_address(&self, user_id: Uuid) -> Uuid {
        let address = Address::create(user_id, NewAddress {
            recipient_name: "Asha".into(), phone: "9876543210".into(), line1: "12 MG Road".into(), line2: None,
            city: "Pune".into(), state: "MH".into(), pincode: "411001".into(), is_default: false,
        });
        let id = address.id;
        self.state.lock().unwrap().addresses.push(address);
        id
    }

    pub fn put_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        self.state.lock().unwrap().cart.push((user_id, CartLine { product_id, quantity, size: None }));
    }

    pub fn cart_len(&self, user_id: Uuid) -> usize { self.state.lock().unwrap().cart.iter().filter(|(u, _)| *u == user_id).count() }
    pub fn order_count(&self) -> usize { self.state.lock().unwrap().orders.len() }
    pub fn order_line_count(&self) -> usize { self.state.lock().unwrap().lines.len() }
    pub fn order(&self, id: Uuid) -> Option<Order> { self.state.lock().unwrap().orders.iter().find(|o| o.id == id).cloned() }
    pub fn lines_of(&self, id: Uuid) -> Vec<OrderLine> { self.state.lock().unwrap().lines.iter().filter(|l| l.order_id == id).cloned().collect() }

    /// Makes every following write fail with a database error.
    pub fn fail_writes(&self) { self.fail_writes.store(true, Ordering::SeqCst); }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) { return Err(StoreError::Database(sqlx::Error::PoolTimedOut)); }
        Ok(())
    }
}

fn same_line(line: &CartLine, product_id: Uuid, size: Option<&str>) -> bool {
    line.product_id == product_id && line.size.as_deref() == size
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        Ok(self.state.lock().unwrap().cart.iter().filter(|(u, _)| *u == user_id).map(|(_, l)| l.clone()).collect())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ProductSnapshot>> {
        let state = self.state.lock().unwrap();
        Ok(ids.iter().filter_map(|id| state.products.get(id).map(Product::snapshot)).collect())
    }

    async fn address(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Address>> {
        Ok(self.state.lock().unwrap().addresses.iter().find(|a| a.id == id && a.is_owned_by(user_id)).cloned())
    }

    async fn order_by_payment_reference(&self, reference: &PaymentReference) -> StoreResult<Option<Order>> {
        Ok(self.state.lock().unwrap().orders.iter().find(|o| o.payment_reference.as_ref() == Some(reference)).cloned())
    }

    async fn place_order(&self, order: &Order, lines: Vec<NewOrderLine>) -> StoreResult<Uuid> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if let Some(reference) = &order.payment_reference {
            if state.orders.iter().any(|o| o.payment_reference.as_ref() == Some(reference)) {
                return Err(StoreError::DuplicatePaymentReference(reference.clone()));
            }
        }
        state.orders.push(order.clone());
        state.lines.extend(lines.into_iter().map(|l| l.attach(order.id)));
        state.cart.retain(|(u, _)| *u != order.user_id);
        Ok(order.id)
    }
}

#[async_trait]
impl StorefrontStore for MemoryStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        let mut all = self.state.lock().unwrap().categories.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.state.lock().unwrap().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn products(&self, query: &ProductQuery) -> StoreResult<Page<Product>> {
        let mut matching: Vec<Product> = self.state.lock().unwrap().products.values().filter(|p| query.matches(p)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = matching.len() as i64;
        let data = matching.into_iter().skip(query.offset() as usize).take(query.per_page as usize).collect();
        Ok(Page { data, total, page: query.page })
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.state.lock().unwrap().products.get(&id).cloned())
    }

    async fn add_cart_line(&self, user_id: Uuid, line: CartLine) -> StoreResult<CartLine> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if let Some((_, existing)) = state.cart.iter_mut().find(|(u, l)| *u == user_id && same_line(l, line.product_id, line.size.as_deref())) {
            existing.quantity += line.quantity;
            return Ok(existing.clone());
        }
        state.cart.push((user_id, line.clone()));
        Ok(line)
    }

    async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, size: Option<&str>, quantity: i32) -> StoreResult<Option<CartLine>> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.cart.iter_mut().find(|(u, l)| *u == user_id && same_line(l, product_id, size)).map(|(_, l)| { l.quantity = quantity; l.clone() }))
    }

    async fn remove_cart_line(&self, user_id: Uuid, product_id: Uuid, size: Option<&str>) -> StoreResult<bool> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let before = state.cart.len();
        state.cart.retain(|(u, l)| !(*u == user_id && same_line(l, product_id, size)));
        Ok(state.cart.len() < before)
    }

    async fn clear_cart(&self, user_id: Uuid) -> StoreResult<u64> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let before = state.cart.len();
        state.cart.retain(|(u, _)| *u != user_id);
        Ok((before - state.cart.len()) as u64)
    }

    async fn addresses(&self, user_id: Uuid) -> StoreResult<Vec<Address>> {
        let mut owned: Vec<Address> = self.state.lock().unwrap().addresses.iter().filter(|a| a.is_owned_by(user_id)).cloned().collect();
        owned.sort_by_key(|a| !a.is_default);
        Ok(owned)
    }

    async fn insert_address(&self, user_id: Uuid, address: NewAddress) -> StoreResult<Address> {
        self.check_writable()?;
        let address = Address::create(user_id, address);
        let mut state = self.state.lock().unwrap();
        if address.is_default {
            state.addresses.iter_mut().filter(|a| a.is_owned_by(user_id)).for_each(|a| a.is_default = false);
        }
        state.addresses.push(address.clone());
        Ok(address)
    }

    async fn set_default_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Address>> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if !state.addresses.iter().any(|a| a.id == id && a.is_owned_by(user_id)) { return Ok(None); }
        for a in state.addresses.iter_mut().filter(|a| a.is_owned_by(user_id)) { a.is_default = a.id == id; }
        Ok(state.addresses.iter().find(|a| a.id == id).cloned())
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let before = state.addresses.len();
        state.addresses.retain(|a| !(a.id == id && a.is_owned_by(user_id)));
        Ok(state.addresses.len() < before)
    }

    async fn wishlist(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.wishlist.iter().filter(|(u, _)| *u == user_id).map(|(_, w)| WishlistItem { product: state.products.get(&w.product_id).map(Product::snapshot), ..w.clone() }).collect())
    }

    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<WishlistAdd> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if state.wishlist.iter().any(|(u, w)| *u == user_id && w.product_id == product_id) { return Ok(WishlistAdd::AlreadyPresent); }
        state.wishlist.push((user_id, WishlistItem { product_id, created_at: Utc::now(), product: None }));
        Ok(WishlistAdd::Added)
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let before = state.wishlist.len();
        state.wishlist.retain(|(u, w)| !(*u == user_id && w.product_id == product_id));
        Ok(state.wishlist.len() < before)
    }

    async fn orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let mut owned: Vec<Order> = self.state.lock().unwrap().orders.iter().filter(|o| o.user_id == user_id).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn order_with_lines(&self, user_id: Uuid, order_id: Uuid) -> StoreResult<Option<OrderWithLines>> {
        let state = self.state.lock().unwrap();
        Ok(state.orders.iter().find(|o| o.id == order_id && o.user_id == user_id).map(|o| OrderWithLines {
            order: o.clone(),
            lines: state.lines.iter().filter(|l| l.order_id == order_id).cloned().collect(),
        }))
    }
}
