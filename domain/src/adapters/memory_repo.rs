use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::{CoreError, NewOrder, Order, OrderId, OrderRepository};

/// Simple in-memory order store. Not tuned for high concurrency beyond the
/// internal mutex guarding the map.
pub struct InMemoryOrderRepo {
    inner: Mutex<Inner>,
}

struct Inner {
    orders: BTreeMap<i64, Order>,
    // None once an order sits at i64::MAX.
    next_id: Option<i64>,
}

impl InMemoryOrderRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                orders: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    /// Build a store pre-populated with the given orders.
    pub fn with_orders<I: IntoIterator<Item = Order>>(orders: I) -> Result<Self, CoreError> {
        let repo = Self::new();
        for order in orders {
            repo.insert(order)?;
        }
        Ok(repo)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    /// Insert an order with an explicit id. Fails if the id is taken.
    pub fn insert(&self, order: Order) -> Result<(), CoreError> {
        let mut inner = self.lock()?;
        let key = order.id.get();
        if inner.orders.contains_key(&key) {
            return Err(CoreError::AlreadyExists);
        }
        if inner.next_id.is_some_and(|next| key >= next) {
            inner.next_id = key.checked_add(1);
        }
        inner.orders.insert(key, order);
        Ok(())
    }

    /// Number of stored orders.
    pub fn count(&self) -> Result<u64, CoreError> {
        Ok(self.lock()?.orders.len() as u64)
    }

    /// Create an order, assigning the next free id.
    ///
    /// Fails with `Repository` once ids above the highest stored one run out.
    pub fn create(&self, input: NewOrder) -> Result<Order, CoreError> {
        let mut inner = self.lock()?;
        let id = inner
            .next_id
            .ok_or_else(|| CoreError::Repository("id space exhausted".into()))?;
        if inner.orders.contains_key(&id) {
            return Err(CoreError::AlreadyExists);
        }
        inner.next_id = id.checked_add(1);
        let order = Order::new(OrderId::new(id), input.moment, input.status);
        inner.orders.insert(id, order.clone());
        Ok(order)
    }
}

impl Default for InMemoryOrderRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderRepository for InMemoryOrderRepo {
    fn find_all(&self) -> Result<Vec<Order>, CoreError> {
        let inner = self.lock()?;
        Ok(inner.orders.values().cloned().collect())
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, CoreError> {
        let inner = self.lock()?;
        Ok(inner.orders.get(&id.get()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderStatus;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn new_order(status: OrderStatus) -> NewOrder {
        NewOrder {
            moment: UNIX_EPOCH + Duration::from_secs(1_000),
            status,
        }
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let repo = InMemoryOrderRepo::new();
        let a = repo.create(new_order(OrderStatus::Paid)).unwrap();
        let b = repo.create(new_order(OrderStatus::Shipped)).unwrap();
        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);
        assert_eq!(repo.find_by_id(b.id).unwrap(), Some(b));
    }

    #[test]
    fn insert_duplicate_id_conflicts() {
        let repo = InMemoryOrderRepo::new();
        let o = Order::new(OrderId::new(3), SystemTime::UNIX_EPOCH, OrderStatus::Paid);
        repo.insert(o.clone()).unwrap();
        let err = repo.insert(o).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists));
    }

    #[test]
    fn create_skips_past_inserted_ids() {
        let repo = InMemoryOrderRepo::new();
        repo.insert(Order::new(
            OrderId::new(10),
            SystemTime::UNIX_EPOCH,
            OrderStatus::Delivered,
        ))
        .unwrap();
        let created = repo.create(new_order(OrderStatus::Paid)).unwrap();
        assert_eq!(created.id.get(), 11);
    }

    #[test]
    fn create_after_max_id_fails_without_overwriting() {
        let repo = InMemoryOrderRepo::new();
        let last = Order::new(
            OrderId::new(i64::MAX),
            SystemTime::UNIX_EPOCH,
            OrderStatus::Delivered,
        );
        repo.insert(last.clone()).unwrap();

        let err = repo.create(new_order(OrderStatus::Canceled)).unwrap_err();
        assert!(matches!(err, CoreError::Repository(_)));
        assert_eq!(repo.find_by_id(OrderId::new(i64::MAX)).unwrap(), Some(last));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn find_all_is_ordered_by_id() {
        let repo = InMemoryOrderRepo::with_orders(
            [3, 1, 2].map(|i| Order::new(OrderId::new(i), UNIX_EPOCH, OrderStatus::Paid)),
        )
        .unwrap();
        let ids: Vec<i64> = repo.find_all().unwrap().iter().map(|o| o.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn find_by_id_absent_is_none() {
        let repo = InMemoryOrderRepo::new();
        assert_eq!(repo.find_by_id(OrderId::new(1)).unwrap(), None);
    }
}
