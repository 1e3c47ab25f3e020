//! The cart store: authoritative in-memory state mirrored to storage.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use turbo_kv::{Cache, KvStore};

use crate::cart::{CartState, NewCartItem};
use crate::config::CartConfig;
use crate::error::CartError;
use crate::ids::ProductId;
use crate::provider::CartProvider;
use crate::snapshot::{CartSubscription, Products};
use crate::writer::{PendingWrite, WriteQueue};

/// Result of the initial load from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A persisted cart was found and replaced the in-memory state.
    Restored { items: usize },
    /// Nothing was persisted under the cart key. The key stays absent until
    /// the first change.
    Empty,
    /// Loading failed; the store kept its empty state.
    Failed(String),
}

/// Owner of a cart.
///
/// Opening a store returns immediately. The persisted cart is loaded in the
/// background; until it arrives the store reports an empty cart, then it
/// switches to the persisted items. Every state change after that is written
/// back to storage by a background writer.
///
/// Consumers work through a [`CartHandle`], either passed to them directly
/// via [`CartStore::handle`] or made ambient with [`CartStore::provider`].
///
/// # Example
///
/// ```rust,ignore
/// let store = CartStore::open(FileStore::open(".cart").await?, &CartConfig::default());
/// store.ready().await?;
///
/// let cart = store.handle();
/// cart.add_to_cart(NewCartItem::new("sku-1", "Mug", "https://img/mug.png", 8.5))?;
/// cart.increment(&"sku-1".into())?;
/// store.flush().await?;
/// ```
pub struct CartStore {
    handle: CartHandle,
    loaded: watch::Receiver<Option<LoadOutcome>>,
}

impl CartStore {
    /// Open a cart backed by `store`, using the key from `config`.
    ///
    /// # Panics
    ///
    /// * If called outside of a Tokio runtime
    pub fn open<S>(store: S, config: &CartConfig) -> Self
    where
        S: KvStore + 'static,
    {
        let key = config.storage_key();
        let cache = Cache::new(Arc::new(store) as Arc<dyn KvStore>);
        let (writer, worker) = WriteQueue::new(cache.clone(), key.clone());
        let (state, _) = watch::channel(Products::empty());

        let handle = CartHandle {
            inner: Arc::new(Inner { state, writer, key }),
        };

        let (loaded_tx, loaded) = watch::channel(None);
        let loader = handle.clone();
        tokio::spawn(async move {
            let outcome = loader.restore(&cache).await;
            loaded_tx.send_replace(Some(outcome));
            // The worker must not keep the store alive.
            drop(loader);
            worker.run().await;
        });

        Self { handle, loaded }
    }

    /// Wait for the initial load to finish.
    ///
    /// Returns immediately once the load has completed.
    pub async fn ready(&self) -> Result<LoadOutcome, CartError> {
        let mut loaded = self.loaded.clone();
        let outcome = loaded
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CartError::StoreClosed)?
            .clone();
        outcome.ok_or(CartError::StoreClosed)
    }

    /// A handle to pass to consumers.
    pub fn handle(&self) -> CartHandle {
        self.handle.clone()
    }

    /// A provider that makes this store available through
    /// [`use_cart`](crate::provider::use_cart).
    pub fn provider(&self) -> CartProvider {
        CartProvider::new(self.handle())
    }

    /// Wait until every change made so far is written.
    pub async fn flush(&self) -> Result<(), CartError> {
        self.handle.flush().await
    }

    /// Storage key of this cart.
    pub fn key(&self) -> &str {
        self.handle.key()
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("handle", &self.handle)
            .field("loaded", &*self.loaded.borrow())
            .finish()
    }
}

struct Inner {
    state: watch::Sender<Products>,
    writer: WriteQueue,
    key: String,
}

/// The cart capability set: read products, add, increment, decrement.
///
/// Cheap to clone; all clones share one cart. Mutations update the
/// in-memory state before returning and queue the write in the background;
/// the returned [`PendingWrite`] can be awaited or dropped.
#[derive(Clone)]
pub struct CartHandle {
    inner: Arc<Inner>,
}

impl CartHandle {
    /// Current cart snapshot.
    pub fn products(&self) -> Products {
        self.inner.state.borrow().clone()
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.inner.state.borrow().revision()
    }

    /// Subscribe to cart changes.
    pub fn subscribe(&self) -> CartSubscription {
        CartSubscription::new(self.inner.state.subscribe())
    }

    /// Add a product to the cart.
    ///
    /// A missing or zero quantity counts as 1. If the product is already in
    /// the cart its quantity goes up by one and its other fields are kept.
    pub fn add_to_cart(&self, item: NewCartItem) -> Result<PendingWrite, CartError> {
        self.apply("add_to_cart", move |state| state.added(item).map(Some))
    }

    /// Add one unit of a product already in the cart.
    ///
    /// Fails with [`CartError::ItemNotInCart`] for an unknown id, leaving
    /// the cart unchanged.
    pub fn increment(&self, id: &ProductId) -> Result<PendingWrite, CartError> {
        self.apply("increment", |state| state.incremented(id).map(Some))
    }

    /// Remove one unit of a product. Removing the last unit drops the item.
    ///
    /// Fails with [`CartError::ItemNotInCart`] for an unknown id, leaving
    /// the cart unchanged.
    pub fn decrement(&self, id: &ProductId) -> Result<PendingWrite, CartError> {
        self.apply("decrement", |state| state.decremented(id).map(Some))
    }

    /// Remove every item.
    pub fn clear(&self) -> Result<PendingWrite, CartError> {
        self.apply("clear", |state| Ok((!state.is_empty()).then(CartState::new)))
    }

    /// Wait until every change made so far is written.
    ///
    /// "So far" covers every revision visible to this caller: its write is
    /// queued before the revision is published.
    pub async fn flush(&self) -> Result<(), CartError> {
        self.inner.writer.flush(self.revision()).wait().await
    }

    /// Storage key of this cart.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Run `op` against the current state and publish its result.
    ///
    /// `Ok(None)` means "no change": nothing is published or written.
    fn apply<F>(&self, op: &'static str, f: F) -> Result<PendingWrite, CartError>
    where
        F: FnOnce(&CartState) -> Result<Option<CartState>, CartError>,
    {
        let writer = &self.inner.writer;
        let mut outcome = Ok(None);
        // The write is queued while the new revision is published, so a
        // flush that observes a revision always finds its write ahead of it.
        self.inner
            .state
            .send_if_modified(|current| match f(current.state()) {
                Ok(Some(next)) => {
                    *current = current.next(next);
                    outcome = Ok(Some((
                        current.revision(),
                        current.len(),
                        writer.persist(current.clone()),
                    )));
                    true
                }
                Ok(None) => false,
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            });

        match outcome {
            Ok(Some((revision, items, pending))) => {
                debug!(op, revision, items, "cart updated");
                Ok(pending)
            }
            Ok(None) => Ok(PendingWrite::unchanged(self.revision())),
            Err(err) => {
                debug!(op, error = %err, "cart operation rejected");
                Err(err)
            }
        }
    }

    /// Load the persisted cart and make it the current state.
    async fn restore(&self, cache: &Cache<Arc<dyn KvStore>>) -> LoadOutcome {
        let key = self.key();
        match cache.get::<CartState>(key).await {
            Ok(Some(state)) => {
                let items = state.len();
                // The restored state is itself a change and is written back.
                if let Err(e) = self.apply("restore", move |_| Ok(Some(state))) {
                    warn!(key, error = %e, "failed to apply restored cart");
                }
                info!(key, items, "restored persisted cart");
                LoadOutcome::Restored { items }
            }
            Ok(None) => {
                debug!(key, "no persisted cart");
                LoadOutcome::Empty
            }
            Err(e) => {
                warn!(key, error = %e, "failed to load persisted cart");
                LoadOutcome::Failed(e.to_string())
            }
        }
    }
}

impl fmt::Debug for CartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartHandle")
            .field("key", &self.inner.key)
            .field("revision", &self.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use turbo_kv::{KvError, MemoryStore};

    const KEY: &str = "@turbo-cart:products";

    /// Memory-backed store with switchable faults and a write counter.
    #[derive(Default)]
    struct TestStore {
        inner: MemoryStore,
        fail_get: bool,
        fail_set: bool,
        sets: AtomicUsize,
    }

    impl TestStore {
        fn sets(&self) -> usize {
            self.sets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KvStore for TestStore {
        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            if self.fail_get {
                return Err(KvError::StoreError("disk unavailable".to_string()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            if self.fail_set {
                return Err(KvError::StoreError("disk full".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), KvError> {
            self.inner.delete(key).await
        }

        async fn keys(&self) -> Result<Vec<String>, KvError> {
            self.inner.keys().await
        }
    }

    fn item(id: &str) -> NewCartItem {
        NewCartItem::new(id, format!("Title {}", id), format!("https://img/{}.png", id), 10.0)
    }

    async fn persisted<S: KvStore>(storage: &S) -> Option<Vec<CartItem>> {
        storage
            .get(KEY)
            .await
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    fn sorted(mut items: Vec<CartItem>) -> Vec<CartItem> {
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    #[tokio::test]
    async fn test_store_is_usable_before_load() {
        let storage = MemoryStore::with_entries([(
            KEY,
            r#"[{"id":"a","title":"T","image_url":"u","price":10.0,"quantity":3}]"#,
        )]);
        let store = CartStore::open(storage, &CartConfig::default());

        assert!(store.handle().products().is_empty());

        assert_eq!(store.ready().await.unwrap(), LoadOutcome::Restored { items: 1 });
        let products = store.handle().products();
        assert_eq!(products.get(&"a".into()).unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_ready_is_repeatable() {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::open(storage.clone(), &CartConfig::default());

        assert_eq!(store.ready().await.unwrap(), LoadOutcome::Empty);
        assert_eq!(store.ready().await.unwrap(), LoadOutcome::Empty);

        store.flush().await.unwrap();
        assert!(!storage.exists(KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::open(storage.clone(), &CartConfig::default());
        store.ready().await.unwrap();

        let cart = store.handle();
        let id = ProductId::new("a");

        cart.add_to_cart(NewCartItem::new("a", "T", "u", 10.0)).unwrap();
        let products = cart.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products.items()[0].id, id);
        assert_eq!(products.items()[0].quantity, 1);

        cart.increment(&id).unwrap();
        assert_eq!(cart.products().get(&id).unwrap().quantity, 2);

        cart.decrement(&id).unwrap();
        assert_eq!(cart.products().get(&id).unwrap().quantity, 1);

        cart.decrement(&id).unwrap();
        assert!(cart.products().is_empty());

        store.flush().await.unwrap();
        assert_eq!(persisted(&storage).await, Some(vec![]));
    }

    #[tokio::test]
    async fn test_add_existing_does_not_duplicate() {
        let store = CartStore::open(MemoryStore::new(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        cart.add_to_cart(item("a")).unwrap();
        cart.add_to_cart(item("b")).unwrap();
        cart.add_to_cart(item("a").with_quantity(7)).unwrap();

        let products = cart.products();
        assert_eq!(products.len(), 2);
        assert_eq!(products.get(&"a".into()).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_each_change_is_a_new_snapshot() {
        let store = CartStore::open(MemoryStore::new(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        let before = cart.products();
        cart.add_to_cart(item("a")).unwrap();
        let after = cart.products();

        assert!(!before.same_as(&after));
        assert_eq!(after.revision(), before.revision() + 1);
        assert!(before.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_changes_nothing() {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::open(storage.clone(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        cart.add_to_cart(item("a")).unwrap();
        let before = cart.products();

        let ghost = ProductId::new("ghost");
        assert_eq!(
            cart.increment(&ghost).unwrap_err(),
            CartError::ItemNotInCart(ghost.clone())
        );
        assert_eq!(
            cart.decrement(&ghost).unwrap_err(),
            CartError::ItemNotInCart(ghost)
        );

        assert!(cart.products().same_as(&before));
        store.flush().await.unwrap();
        assert_eq!(persisted(&storage).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_round_trip() {
        let storage = Arc::new(MemoryStore::new());

        let before = {
            let store = CartStore::open(storage.clone(), &CartConfig::default());
            store.ready().await.unwrap();
            let cart = store.handle();

            cart.add_to_cart(item("a")).unwrap();
            cart.add_to_cart(item("b").with_quantity(2)).unwrap();
            cart.add_to_cart(item("c")).unwrap();
            cart.increment(&"a".into()).unwrap();
            cart.decrement(&"c".into()).unwrap();

            store.flush().await.unwrap();
            cart.products().items().to_vec()
        };

        let reopened = CartStore::open(storage.clone(), &CartConfig::default());
        assert_eq!(
            reopened.ready().await.unwrap(),
            LoadOutcome::Restored { items: 2 }
        );

        let after = reopened.handle().products().items().to_vec();
        assert_eq!(sorted(after), sorted(before));
    }

    #[tokio::test]
    async fn test_restart_with_file_store() {
        let tmp = tempfile::tempdir().unwrap();

        {
            let files = turbo_kv::FileStore::open(tmp.path()).await.unwrap();
            let store = CartStore::open(files, &CartConfig::default());
            store.ready().await.unwrap();
            store.handle().add_to_cart(item("a")).unwrap().wait().await.unwrap();
        }

        let files = turbo_kv::FileStore::open(tmp.path()).await.unwrap();
        let store = CartStore::open(files, &CartConfig::default());
        assert_eq!(store.ready().await.unwrap(), LoadOutcome::Restored { items: 1 });
        assert!(store.handle().products().contains(&"a".into()));
    }

    #[tokio::test]
    async fn test_non_finite_price_keeps_saved_cart_loadable() {
        let storage = Arc::new(MemoryStore::new());

        {
            let store = CartStore::open(storage.clone(), &CartConfig::default());
            store.ready().await.unwrap();
            let cart = store.handle();

            cart.add_to_cart(NewCartItem::new("keep", "Keep", "u", 8.5)).unwrap();
            for price in [f64::INFINITY, f64::NAN] {
                assert_eq!(
                    cart.add_to_cart(NewCartItem::new("bad", "Bad", "u", price))
                        .unwrap_err(),
                    CartError::InvalidPrice("bad".into())
                );
            }
            store.flush().await.unwrap();
        }

        let reopened = CartStore::open(storage.clone(), &CartConfig::default());
        assert_eq!(
            reopened.ready().await.unwrap(),
            LoadOutcome::Restored { items: 1 }
        );

        let cart = reopened.handle();
        cart.add_to_cart(item("new")).unwrap().wait().await.unwrap();
        let ids: Vec<_> = persisted(&storage)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![ProductId::new("keep"), ProductId::new("new")]);
    }

    #[tokio::test]
    async fn test_flush_after_restore_waits_for_write_back() {
        let storage = Arc::new(TestStore::default());
        let saved = r#"[{"id":"a","title":"T","image_url":"u","price":1.0,"quantity":1}]"#;
        storage.inner.set(KEY, saved.to_string()).await.unwrap();

        let store = CartStore::open(storage.clone(), &CartConfig::default());
        store.ready().await.unwrap();
        store.flush().await.unwrap();

        assert_eq!(storage.sets(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_flush_covers_revisions_seen_from_other_tasks() {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::open(storage.clone(), &CartConfig::default());
        store.ready().await.unwrap();

        let writer = store.handle();
        let adds = tokio::spawn(async move {
            for n in 0..200 {
                writer.add_to_cart(item(&format!("p{:03}", n))).unwrap();
                tokio::task::yield_now().await;
            }
        });

        let reader = store.handle();
        let checks = tokio::spawn(async move {
            for _ in 0..200 {
                let seen = reader.products();
                reader.flush().await.unwrap();
                let saved = persisted(&storage).await.unwrap_or_default();
                assert!(saved.len() >= seen.len());
                for item in seen.iter() {
                    assert!(saved.iter().any(|s| s.id == item.id));
                }
                tokio::task::yield_now().await;
            }
        });

        adds.await.unwrap();
        checks.await.unwrap();
    }

    #[tokio::test]
    async fn test_load_replaces_early_changes() {
        let storage = MemoryStore::with_entries([(
            KEY,
            r#"[{"id":"a","title":"T","image_url":"u","price":10.0,"quantity":1}]"#,
        )]);
        let store = CartStore::open(storage, &CartConfig::default());
        let cart = store.handle();

        cart.add_to_cart(item("early")).unwrap();
        store.ready().await.unwrap();

        let products = cart.products();
        assert_eq!(products.len(), 1);
        assert!(products.contains(&"a".into()));
    }

    #[tokio::test]
    async fn test_corrupt_blob_leaves_store_empty() {
        let storage = MemoryStore::with_entries([(KEY, "{not json")]);
        let store = CartStore::open(storage, &CartConfig::default());

        assert!(matches!(store.ready().await.unwrap(), LoadOutcome::Failed(_)));

        let cart = store.handle();
        assert!(cart.products().is_empty());
        cart.add_to_cart(item("a")).unwrap().wait().await.unwrap();
        assert_eq!(cart.products().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_blob_leaves_store_empty() {
        let storage = MemoryStore::with_entries([(
            KEY,
            r#"[{"id":"a","title":"T","image_url":"u","price":1.0,"quantity":0}]"#,
        )]);
        let store = CartStore::open(storage, &CartConfig::default());

        assert!(matches!(store.ready().await.unwrap(), LoadOutcome::Failed(_)));
        assert!(store.handle().products().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_leaves_store_empty() {
        let storage = TestStore {
            fail_get: true,
            ..TestStore::default()
        };
        let store = CartStore::open(storage, &CartConfig::default());

        assert_eq!(
            store.ready().await.unwrap(),
            LoadOutcome::Failed("Store operation failed: disk unavailable".to_string())
        );
        assert!(store.handle().products().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_is_reported_not_fatal() {
        let storage = TestStore {
            fail_set: true,
            ..TestStore::default()
        };
        let store = CartStore::open(storage, &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        let write = cart.add_to_cart(item("a")).unwrap();
        assert!(matches!(write.wait().await, Err(CartError::Persistence(_))));
        assert_eq!(cart.products().len(), 1);
        assert!(matches!(store.flush().await, Err(CartError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_queued_writes_coalesce_to_latest() {
        let storage = Arc::new(TestStore::default());
        let store = CartStore::open(storage.clone(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        for i in 0..20 {
            cart.add_to_cart(item(&format!("p{:02}", i))).unwrap();
        }
        for i in (0..20).step_by(2) {
            cart.decrement(&ProductId::new(format!("p{:02}", i))).unwrap();
        }
        store.flush().await.unwrap();

        assert_eq!(storage.sets(), 1);
        assert_eq!(
            persisted(&storage).await.unwrap(),
            cart.products().items().to_vec()
        );
    }

    #[tokio::test]
    async fn test_pending_write_carries_revision() {
        let store = CartStore::open(MemoryStore::new(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        let first = cart.add_to_cart(item("a")).unwrap();
        let second = cart.increment(&"a".into()).unwrap();

        assert_eq!(second.revision(), first.revision() + 1);
        first.wait().await.unwrap();
        second.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::open(storage.clone(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();

        cart.add_to_cart(item("a")).unwrap();
        cart.add_to_cart(item("b")).unwrap();
        cart.clear().unwrap().wait().await.unwrap();

        assert!(cart.products().is_empty());
        assert_eq!(persisted(&storage).await, Some(vec![]));

        let revision = cart.revision();
        let noop = cart.clear().unwrap();
        assert_eq!(noop.revision(), revision);
        assert_eq!(cart.revision(), revision);
    }

    #[tokio::test]
    async fn test_subscriber_sees_changes() {
        let store = CartStore::open(MemoryStore::new(), &CartConfig::default());
        store.ready().await.unwrap();
        let cart = store.handle();
        let mut subscription = cart.subscribe();

        cart.add_to_cart(item("a")).unwrap();
        let snapshot = subscription.changed().await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.same_as(&cart.products()));
        assert!(subscription.current().same_as(&snapshot));
    }

    #[tokio::test]
    async fn test_subscription_ends_with_store() {
        let store = CartStore::open(MemoryStore::new(), &CartConfig::default());
        store.ready().await.unwrap();
        let mut subscription = store.handle().subscribe();

        drop(store);
        assert_eq!(subscription.changed().await.unwrap_err(), CartError::StoreClosed);
    }

    #[tokio::test]
    async fn test_custom_key() {
        let storage = Arc::new(MemoryStore::new());
        let config = CartConfig::new("shop").with_key("basket");
        let store = CartStore::open(storage.clone(), &config);
        store.ready().await.unwrap();

        assert_eq!(store.key(), "@shop:basket");
        store.handle().add_to_cart(item("a")).unwrap().wait().await.unwrap();
        assert!(storage.exists("@shop:basket").await.unwrap());
        assert!(!storage.exists(KEY).await.unwrap());
    }
}
