//! Client cart cache
//!
//! UI code reads cart contents synchronously from here. Quantity edits are
//! applied locally at once and written to the server after a per-product
//! quiet window; only the settled value is sent. A failed write throws the
//! local view away and reloads it from the server.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::client::{CartApi, DebounceRegistry, IdentityHandle};
use crate::config::CacheConfig;
use crate::domain::aggregates::{CartItem, Product};
use crate::domain::value_objects::{Money, Quantity, QuantityError, SessionToken};
use crate::error::ApiFailure;
use crate::session::SessionContext;

/// What a product row shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowState {
    NotInCart,
    /// Quantity selector visible; `pending` while a debounced write is outstanding.
    InCart { quantity: u32, pending: bool },
}

#[derive(Debug, Default)]
struct CacheState {
    customer_id: Option<i64>,
    session_token: Option<String>,
    items: Vec<CartItem>,
    loading: bool,
    /// product id -> generation of its newest unsettled write
    pending: HashMap<i64, u64>,
    next_generation: u64,
    /// bumped on identity change; results from an older epoch are dropped
    epoch: u64,
}

impl CacheState {
    fn context(&self) -> SessionContext {
        SessionContext { customer_id: self.customer_id, session_token: self.session_token.clone() }
    }

    fn reset_identity(&mut self, customer_id: Option<i64>) {
        self.customer_id = customer_id;
        // a customer resolves by id; an anonymous shopper needs a token of its own
        self.session_token = match customer_id {
            Some(_) => None,
            None => Some(SessionToken::anonymous().to_string()),
        };
        self.items.clear();
        self.pending.clear();
        self.epoch += 1;
    }
}

struct Inner<A> {
    api: A,
    state: RwLock<CacheState>,
    debounce: DebounceRegistry<i64>,
}

pub struct CartCache<A: CartApi> {
    inner: Arc<Inner<A>>,
}

impl<A: CartApi> Clone for CartCache<A> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<A: CartApi> CartCache<A> {
    pub fn new(api: A, config: &CacheConfig, customer_id: Option<i64>) -> Self {
        let mut state = CacheState::default();
        state.reset_identity(customer_id);
        Self { inner: Arc::new(Inner { api, state: RwLock::new(state), debounce: DebounceRegistry::new(config.debounce) }) }
    }

    /// Resumes an anonymous cart under a token remembered from an earlier visit.
    pub fn with_session_token(api: A, config: &CacheConfig, token: impl Into<String>) -> Self {
        let cache = Self::new(api, config, None);
        cache.inner.state.write().session_token = Some(token.into());
        cache
    }

    pub fn api(&self) -> &A { &self.inner.api }

    // --- synchronous view ---

    pub fn items(&self) -> Vec<CartItem> { self.inner.state.read().items.clone() }
    pub fn is_loading(&self) -> bool { self.inner.state.read().loading }
    pub fn session_token(&self) -> Option<String> { self.inner.state.read().session_token.clone() }
    pub fn customer_id(&self) -> Option<i64> { self.inner.state.read().customer_id }

    pub fn row_state(&self, product_id: i64) -> RowState {
        let state = self.inner.state.read();
        match state.items.iter().find(|i| i.product_id == product_id) {
            Some(item) => RowState::InCart { quantity: item.quantity, pending: state.pending.contains_key(&product_id) },
            None => RowState::NotInCart,
        }
    }

    pub fn line_count(&self) -> usize { self.inner.state.read().items.len() }

    pub fn total_quantity(&self) -> u32 { self.inner.state.read().items.iter().map(|i| i.quantity).sum() }

    /// Sum of price x quantity x items per pack over the current view.
    pub fn subtotal(&self) -> Money {
        self.inner.state.read().items.iter().fold(Money::zero(), |acc, i| acc.add(&i.line_total()))
    }

    // --- server round trips ---

    /// Replaces the view with the server's cart. Products with a write still
    /// outstanding keep their local quantity.
    pub async fn reload(&self) -> Result<(), ApiFailure> {
        let (ctx, epoch) = {
            let mut state = self.inner.state.write();
            state.loading = true;
            (state.context(), state.epoch)
        };
        let result = self.inner.api.list_cart(&ctx).await;

        let mut state = self.inner.state.write();
        if state.epoch != epoch {
            debug!("discarding cart listing from a previous identity");
            return Ok(());
        }
        state.loading = false;
        let listing = result?;
        if listing.session_token.is_some() { state.session_token = listing.session_token; }
        let local: HashMap<i64, u32> = state.items.iter().map(|i| (i.product_id, i.quantity)).collect();
        let mut items = listing.items;
        for item in items.iter_mut() {
            if state.pending.contains_key(&item.product_id) {
                if let Some(q) = local.get(&item.product_id) { item.quantity = *q; }
            }
        }
        // a pending zero means the row was removed locally and is not back yet
        items.retain(|i| !(state.pending.contains_key(&i.product_id) && !local.contains_key(&i.product_id)));
        state.items = items;
        Ok(())
    }

    /// Puts `product` in the cart with quantity 1, immediately. For a product
    /// already in the cart this is a +1 on its selector.
    pub async fn add(&self, product: &Product) -> Result<RowState, ApiFailure> {
        if let RowState::InCart { quantity, .. } = self.row_state(product.id) {
            return Ok(self.set_quantity(product.id, quantity.saturating_add(1)));
        }
        // a removal of this product still on its timer or in flight lands first
        self.inner.debounce.flush(&product.id).await;
        let (ctx, epoch) = { let s = self.inner.state.read(); (s.context(), s.epoch) };
        match self.inner.api.add_to_cart(&ctx, product.id, 1).await {
            Ok(added) => {
                {
                    let mut state = self.inner.state.write();
                    if state.epoch == epoch {
                        state.session_token = Some(added.session_token);
                        state.items.retain(|i| i.product_id != product.id);
                        state.items.insert(0, CartItem {
                            line_id: added.line_id, product_id: product.id, quantity: added.quantity,
                            name: product.name.clone(), price: product.price, items_per_pack: product.items_per_pack,
                            stock: product.stock, status: product.status, category_name: product.category_name.clone(),
                            image: product.image.clone(), created_at: chrono::Utc::now(),
                        });
                    }
                }
                info!(product_id = product.id, line_id = added.line_id, "added to cart");
                Ok(self.row_state(product.id))
            }
            Err(e) => {
                warn!(product_id = product.id, code = %e.code, "add to cart failed; reloading");
                self.reload_quietly().await;
                Err(e)
            }
        }
    }

    /// Optimistically sets a product's quantity and schedules the debounced
    /// write. Zero removes the row at once. Unknown products are left alone.
    pub fn set_quantity(&self, product_id: i64, quantity: u32) -> RowState {
        let quantity = quantity.min(Quantity::MAX);
        let (line_id, generation) = {
            let mut state = self.inner.state.write();
            let Some(pos) = state.items.iter().position(|i| i.product_id == product_id) else { return RowState::NotInCart };
            let line_id = state.items[pos].line_id;
            if quantity == 0 { state.items.remove(pos); } else { state.items[pos].quantity = quantity; }
            state.next_generation += 1;
            let generation = state.next_generation;
            state.pending.insert(product_id, generation);
            (line_id, generation)
        };

        let cache = self.clone();
        self.inner.debounce.schedule(product_id, async move {
            cache.write_quantity(product_id, line_id, quantity, generation).await;
        });
        self.row_state(product_id)
    }

    /// Quantity typed into the numeric field.
    pub fn set_quantity_input(&self, product_id: i64, raw: &str) -> Result<RowState, QuantityError> {
        Ok(self.set_quantity(product_id, Quantity::parse_input(raw)?.value()))
    }

    pub fn increment(&self, product_id: i64) -> RowState {
        match self.row_state(product_id) {
            RowState::InCart { quantity, .. } => self.set_quantity(product_id, quantity.saturating_add(1)),
            RowState::NotInCart => RowState::NotInCart,
        }
    }

    pub fn decrement(&self, product_id: i64) -> RowState {
        match self.row_state(product_id) {
            RowState::InCart { quantity, .. } => self.set_quantity(product_id, quantity.saturating_sub(1)),
            RowState::NotInCart => RowState::NotInCart,
        }
    }

    pub fn remove(&self, product_id: i64) -> RowState { self.set_quantity(product_id, 0) }

    pub async fn clear(&self) -> Result<(), ApiFailure> {
        self.inner.debounce.cancel_all();
        let ctx = {
            let mut state = self.inner.state.write();
            state.items.clear();
            state.pending.clear();
            state.context()
        };
        if let Err(e) = self.inner.api.clear_cart(&ctx).await {
            warn!(code = %e.code, "clear cart failed; reloading");
            self.reload_quietly().await;
            return Err(e);
        }
        Ok(())
    }

    /// Switches the cache to another customer (or to anonymous): unsent edits
    /// are dropped, the old view is discarded and the new cart is loaded.
    pub async fn set_customer(&self, customer_id: Option<i64>) -> Result<(), ApiFailure> {
        {
            let mut state = self.inner.state.write();
            if state.customer_id == customer_id && state.session_token.is_some() { return Ok(()); }
            self.inner.debounce.cancel_all();
            state.reset_identity(customer_id);
        }
        info!(customer = ?customer_id, "cart identity changed");
        self.reload().await
    }

    /// Follows login and logout on `identity` until the handle is dropped.
    pub fn follow_identity(&self, identity: &IdentityHandle) -> JoinHandle<()> {
        let mut rx = identity.subscribe();
        let cache = self.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let customer_id = *rx.borrow_and_update();
                if let Err(e) = cache.set_customer(customer_id).await {
                    warn!(code = %e.code, "cart reload after identity change failed");
                }
            }
        })
    }

    /// Waits for every scheduled write to go out and settle.
    pub async fn settle(&self) { self.inner.debounce.settle().await; }

    async fn write_quantity(&self, product_id: i64, line_id: i64, quantity: u32, generation: u64) {
        let (ctx, epoch) = { let s = self.inner.state.read(); (s.context(), s.epoch) };
        let result = self.inner.api.set_quantity(&ctx, line_id, quantity).await;
        let failed = {
            let mut state = self.inner.state.write();
            if state.epoch != epoch { return; }
            if state.pending.get(&product_id) == Some(&generation) { state.pending.remove(&product_id); }
            match result {
                Ok(()) => {
                    debug!(product_id, line_id, quantity, "quantity write settled");
                    None
                }
                Err(e) => {
                    state.pending.remove(&product_id);
                    Some(e)
                }
            }
        };
        if let Some(e) = failed {
            warn!(product_id, line_id, code = %e.code, "quantity write failed; reloading cart");
            self.reload_quietly().await;
        }
    }

    async fn reload_quietly(&self) {
        if let Err(e) = self.reload().await {
            warn!(code = %e.code, "cart reload failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AddedLine;
    use crate::error::ErrorCode;
    use crate::domain::aggregates::ProductStatus;
    use crate::service::tests::{fixture, product};
    use crate::service::{CartListing, CartService};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-process API that records quantity writes and can be told to fail them.
    struct RecordingApi {
        service: CartService,
        writes: Mutex<Vec<(i64, u32)>>,
        lists: AtomicUsize,
        fail_writes: AtomicBool,
    }

    impl RecordingApi {
        fn writes(&self) -> Vec<(i64, u32)> { self.writes.lock().clone() }
    }

    #[async_trait]
    impl CartApi for RecordingApi {
        async fn list_cart(&self, ctx: &SessionContext) -> Result<CartListing, ApiFailure> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.service.list_cart(ctx).await
        }
        async fn add_to_cart(&self, ctx: &SessionContext, product_id: i64, quantity: u32) -> Result<AddedLine, ApiFailure> {
            self.service.add_to_cart(ctx, product_id, quantity).await
        }
        async fn set_quantity(&self, ctx: &SessionContext, line_id: i64, quantity: u32) -> Result<(), ApiFailure> {
            self.writes.lock().push((line_id, quantity));
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ApiFailure::new(ErrorCode::TransientIo, "database unavailable"));
            }
            CartApi::set_quantity(&self.service, ctx, line_id, quantity).await
        }
        async fn clear_cart(&self, ctx: &SessionContext) -> Result<(), ApiFailure> {
            self.service.clear_cart(ctx).await
        }
    }

    fn cache_for(customer_id: Option<i64>) -> (CartCache<RecordingApi>, CartService) {
        let (service, _) = fixture();
        let api = RecordingApi { service: service.clone(), writes: Mutex::new(vec![]), lists: AtomicUsize::new(0), fail_writes: AtomicBool::new(false) };
        (CartCache::new(api, &CacheConfig::default(), customer_id), service)
    }

    async fn server_quantity(service: &CartService, ctx: &SessionContext, product_id: i64) -> Option<u32> {
        service.list(ctx).await.unwrap().items.iter().find(|i| i.product_id == product_id).map(|i| i.quantity)
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_switches_row_to_selector() {
        let (cache, service) = cache_for(Some(7));
        assert_eq!(cache.row_state(10), RowState::NotInCart);
        let row = cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        assert_eq!(row, RowState::InCart { quantity: 1, pending: false });
        assert_eq!(cache.session_token().as_deref(), Some("customer_7"));
        assert_eq!(server_quantity(&service, &SessionContext::customer(7), 10).await, Some(1));
        assert!(cache.api().writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_collapse_into_one_write() {
        let (cache, service) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        let line_id = cache.items()[0].line_id;
        for q in [1, 2, 3, 4] {
            assert_eq!(cache.set_quantity(10, q), RowState::InCart { quantity: q, pending: true });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(cache.api().writes().is_empty());
        cache.settle().await;
        assert_eq!(cache.api().writes(), vec![(line_id, 4)]);
        assert_eq!(cache.row_state(10), RowState::InCart { quantity: 4, pending: false });
        assert_eq!(server_quantity(&service, &SessionContext::customer(7), 10).await, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_reloads_server_truth() {
        let (cache, _) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        cache.api().fail_writes.store(true, Ordering::SeqCst);
        let lists_before = cache.api().lists.load(Ordering::SeqCst);

        cache.set_quantity(10, 9);
        assert_eq!(cache.row_state(10), RowState::InCart { quantity: 9, pending: true });
        cache.settle().await;

        assert_eq!(cache.api().writes().len(), 1);
        assert_eq!(cache.api().lists.load(Ordering::SeqCst), lists_before + 1);
        assert_eq!(cache.row_state(10), RowState::InCart { quantity: 1, pending: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_write_needs_no_reload() {
        let (cache, _) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        let lists_before = cache.api().lists.load(Ordering::SeqCst);
        cache.increment(10);
        cache.settle().await;
        assert_eq!(cache.api().lists.load(Ordering::SeqCst), lists_before);
        assert_eq!(cache.row_state(10), RowState::InCart { quantity: 2, pending: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_driving_to_zero_removes_row() {
        let (cache, service) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        assert_eq!(cache.decrement(10), RowState::NotInCart);
        assert_eq!(cache.line_count(), 0);
        cache.settle().await;
        assert_eq!(server_quantity(&service, &SessionContext::customer(7), 10).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_re_add_within_quiet_window_starts_at_one() {
        let (cache, service) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        let old_line = cache.items()[0].line_id;
        assert_eq!(cache.decrement(10), RowState::NotInCart);

        let row = cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        assert_eq!(row, RowState::InCart { quantity: 1, pending: false });
        cache.settle().await;

        assert_eq!(cache.api().writes(), vec![(old_line, 0)]);
        assert_eq!(cache.row_state(10), RowState::InCart { quantity: 1, pending: false });
        assert_eq!(server_quantity(&service, &SessionContext::customer(7), 10).await, Some(1));
        assert_ne!(cache.items()[0].line_id, old_line);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emptied_input_deletes_line() {
        let (cache, service) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        assert_eq!(cache.set_quantity_input(10, "12").unwrap(), RowState::InCart { quantity: 12, pending: true });
        assert_eq!(cache.set_quantity_input(10, "").unwrap(), RowState::NotInCart);
        assert!(cache.set_quantity_input(10, "lots").is_err());
        cache.settle().await;
        assert_eq!(cache.api().writes().len(), 1);
        assert_eq!(server_quantity(&service, &SessionContext::customer(7), 10).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_of_inactive_product_fails_and_reloads() {
        let (cache, _) = cache_for(Some(7));
        let err = cache.add(&product(20, ProductStatus::Inactive)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInactive);
        assert_eq!(cache.row_state(20), RowState::NotInCart);
        assert!(cache.api().lists.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_totals_follow_local_state() {
        let (cache, _) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        cache.add(&product(11, ProductStatus::Active)).await.unwrap();
        cache.set_quantity(11, 3);
        assert_eq!(cache.line_count(), 2);
        assert_eq!(cache.total_quantity(), 4);
        // 15.00 x 10 per pack x 4 packs
        assert_eq!(cache.subtotal().amount(), Decimal::new(60000, 2));
        cache.settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_cache_binds_to_its_token() {
        let (cache, service) = cache_for(None);
        let token = cache.session_token().unwrap();
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        assert_eq!(cache.session_token().as_deref(), Some(token.as_str()));
        assert_eq!(server_quantity(&service, &SessionContext::token(token.clone()), 10).await, Some(1));

        let resumed = CartCache::with_session_token(service.clone(), &CacheConfig::default(), token);
        resumed.reload().await.unwrap();
        assert_eq!(resumed.row_state(10), RowState::InCart { quantity: 1, pending: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_switches_to_customer_cart() {
        let (cache, service) = cache_for(None);
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        service.add(&SessionContext::customer(7), 5, 2).await.unwrap();

        cache.set_quantity(10, 6);
        cache.set_customer(Some(7)).await.unwrap();
        cache.settle().await;

        assert!(cache.api().writes().is_empty());
        assert_eq!(cache.session_token().as_deref(), Some("customer_7"));
        assert_eq!(cache.row_state(10), RowState::NotInCart);
        assert_eq!(cache.row_state(5), RowState::InCart { quantity: 2, pending: false });

        cache.set_customer(None).await.unwrap();
        assert!(cache.items().is_empty());
        assert!(!cache.session_token().unwrap().starts_with("customer_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_handle_drives_reload() {
        let (cache, service) = cache_for(None);
        service.add(&SessionContext::customer(42), 11, 3).await.unwrap();
        let identity = IdentityHandle::new(None);
        let follower = cache.follow_identity(&identity);

        identity.login(42);
        while cache.customer_id() != Some(42) || cache.is_loading() || cache.line_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.row_state(11), RowState::InCart { quantity: 3, pending: false });
        follower.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_keeps_pending_local_edits() {
        let (cache, _) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        cache.add(&product(11, ProductStatus::Active)).await.unwrap();
        cache.set_quantity(10, 5);
        cache.remove(11);
        cache.reload().await.unwrap();
        assert_eq!(cache.row_state(10), RowState::InCart { quantity: 5, pending: true });
        assert_eq!(cache.row_state(11), RowState::NotInCart);
        cache.settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_both_sides() {
        let (cache, service) = cache_for(Some(7));
        cache.add(&product(10, ProductStatus::Active)).await.unwrap();
        cache.set_quantity(10, 3);
        cache.clear().await.unwrap();
        cache.settle().await;
        assert!(cache.items().is_empty());
        assert!(cache.api().writes().is_empty());
        assert!(service.list(&SessionContext::customer(7)).await.unwrap().items.is_empty());
    }
}
