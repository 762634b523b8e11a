//! Observable reconciliation store for per-product subscription state.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use tokio::sync::watch;

use crate::status::ReconciledItem;
use crate::ProductId;

/// Keyed store of the latest evaluated status per product, unique by
/// product id, with a channel-based publish model: every mutation sends
/// the full current set to subscribers.
///
/// The store is the sole mutator of the set. The mutation and its publish
/// happen under one lock, so a received snapshot always corresponds to the
/// state just applied and concurrent per-key upserts never lose each
/// other's writes.
pub struct ReconciliationStore {
    tracked: BTreeSet<ProductId>,
    inner: Mutex<HashMap<ProductId, ReconciledItem>>,
    publisher: watch::Sender<Vec<ReconciledItem>>,
}

impl ReconciliationStore {
    /// Create an empty store tracking the given product catalog.
    pub fn new(tracked: impl IntoIterator<Item = ProductId>) -> Self {
        let (publisher, _) = watch::channel(Vec::new());
        Self {
            tracked: tracked.into_iter().collect(),
            inner: Mutex::new(HashMap::new()),
            publisher,
        }
    }

    /// Subscribe to set snapshots. The receiver starts at the current set
    /// and observes every subsequent mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ReconciledItem>> {
        self.publisher.subscribe()
    }

    /// Replace-if-present-else-insert by product id, then publish the new
    /// full set.
    pub fn upsert(&self, item: ReconciledItem) {
        let mut inner = self.lock();
        inner.insert(item.product_id.clone(), item);
        self.publish(&inner);
    }

    /// Empty the set and publish the empty snapshot.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.clear();
        self.publish(&inner);
    }

    /// Current full set, ordered by product id.
    pub fn snapshot(&self) -> Vec<ReconciledItem> {
        Self::sorted(&self.lock())
    }

    /// Look up the snapshot for one product.
    pub fn get(&self, product: &ProductId) -> Option<ReconciledItem> {
        self.lock().get(product).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The catalog this store was created with.
    pub fn tracked(&self) -> &BTreeSet<ProductId> {
        &self.tracked
    }

    /// Derived predicate: every tracked product has a reconciled entry.
    pub fn is_fully_processed(&self) -> bool {
        let inner = self.lock();
        self.tracked
            .iter()
            .filter(|id| inner.contains_key(*id))
            .count()
            == self.tracked.len()
    }

    fn publish(&self, inner: &HashMap<ProductId, ReconciledItem>) {
        // send_replace publishes even when no receiver is registered yet.
        self.publisher.send_replace(Self::sorted(inner));
    }

    fn sorted(inner: &HashMap<ProductId, ReconciledItem>) -> Vec<ReconciledItem> {
        let mut items: Vec<ReconciledItem> = inner.values().cloned().collect();
        items.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        items
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ProductId, ReconciledItem>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
