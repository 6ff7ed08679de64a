use crate::{CoreError, Order, OrderId, OrderRepository};

/// Application service for reading orders.
///
/// Generic over the repository so it can be wired with the in-memory store in
/// tests and a real adapter in the server. The repository is passed in at
/// construction; hand it `&repo` or an `Arc` when the caller keeps ownership.
pub struct OrderService<R: OrderRepository> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// All stored orders, unchanged. An empty store yields an empty vec.
    pub fn find_all(&self) -> Result<Vec<Order>, CoreError> {
        self.repo.find_all()
    }

    /// The order with `id`; absence becomes `CoreError::NotFound`.
    pub fn find_by_id(&self, id: OrderId) -> Result<Order, CoreError> {
        self.repo.find_by_id(id)?.ok_or(CoreError::NotFound)
    }
}
