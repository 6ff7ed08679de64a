//! sqlite-adapter — SQLite implementation of the OrderRepository port.
//!
//! Purpose
//! - Provide a lightweight, file-based order store to run the system locally
//!   without an external database server.
//! - Implements the `OrderRepository` trait from the `domain` crate.
//! - Exposes `create()`/`insert()` helpers for seeding; the port itself is read-only.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Stores `moment` as seconds since UNIX_EPOCH.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{CoreError, NewOrder, Order, OrderId, OrderRepository, OrderStatus};
use rusqlite::{params, Connection};

const SELECT_COLUMNS: &str = "SELECT id, moment, status FROM orders";

/// SQLite-backed order repository.
pub struct SqliteOrderRepo {
    conn: Mutex<Connection>,
}

impl SqliteOrderRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database; contents vanish with the repo.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        Self::from_connection(conn)
    }

    /// Construct from env var `DB_PATH` (defaults to `./data/orders.db`).
    pub fn from_env() -> Result<Self, CoreError> {
        let path = std::env::var("DB_PATH").unwrap_or_else(|_| "./data/orders.db".to_string());
        Self::open_creating_dirs(path)
    }

    /// Open at `path`, creating the parent directory first if needed.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    CoreError::Repository(format!("create dir {}: {e}", dir.display()))
                })?;
            }
        }
        Self::new(path)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    /// Insert a new order and return it with the id assigned by SQLite.
    pub fn create(&self, input: NewOrder) -> Result<Order, CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO orders (moment, status) VALUES (?1, ?2)",
            params![system_time_to_secs(input.moment), input.status.as_str()],
        )
        .map_err(map_sqerr)?;
        let id = conn.last_insert_rowid();
        Ok(Order::new(OrderId::new(id), truncate_to_secs(input.moment), input.status))
    }

    /// Insert an order with an explicit id. Fails with `AlreadyExists` if taken.
    pub fn insert(&self, order: &Order) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO orders (id, moment, status) VALUES (?1, ?2, ?3)",
            params![
                order.id.get(),
                system_time_to_secs(order.moment),
                order.status.as_str()
            ],
        );
        match res {
            Ok(_) => Ok(()),
            Err(e) => {
                if let rusqlite::Error::SqliteFailure(err, _) = &e {
                    if err.code == rusqlite::ErrorCode::ConstraintViolation {
                        return Err(CoreError::AlreadyExists);
                    }
                }
                Err(map_sqerr(e))
            }
        }
    }

    /// Number of stored orders.
    pub fn count(&self) -> Result<u64, CoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(map_sqerr)
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            moment INTEGER NOT NULL,
            status TEXT NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn system_time_to_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).unwrap_or(Duration::from_secs(0)).as_secs() as i64
}

fn secs_to_system_time(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn truncate_to_secs(t: SystemTime) -> SystemTime {
    secs_to_system_time(system_time_to_secs(t))
}

fn row_to_order(row: &rusqlite::Row) -> Result<Order, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let moment: i64 = row.get(1).map_err(map_sqerr)?;
    let status_str: String = row.get(2).map_err(map_sqerr)?;

    let status = OrderStatus::parse(&status_str)
        .ok_or_else(|| CoreError::Repository(format!("bad status in db: {status_str}")))?;
    Ok(Order::new(OrderId::new(id), secs_to_system_time(moment), status))
}

impl OrderRepository for SqliteOrderRepo {
    fn find_all(&self) -> Result<Vec<Order>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query([]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_order(row)?);
        }
        Ok(out)
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![id.get()]).map_err(map_sqerr)?;
        let found = match rows.next().map_err(map_sqerr)? {
            Some(row) => Some(row_to_order(row)?),
            None => None,
        };
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_db() -> (SqliteOrderRepo, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let repo = SqliteOrderRepo::new(path).unwrap();
        (repo, dir)
    }

    fn order(id: i64, status: OrderStatus) -> Order {
        Order::new(OrderId::new(id), UNIX_EPOCH + Duration::from_secs(id as u64 * 100), status)
    }

    #[test]
    fn insert_and_find_by_id() {
        let (repo, _dir) = tmp_db();
        let o = order(7, OrderStatus::Shipped);
        repo.insert(&o).unwrap();
        let got = repo.find_by_id(OrderId::new(7)).unwrap().unwrap();
        assert_eq!(got, o);
    }

    #[test]
    fn find_by_id_absent_is_none() {
        let (repo, _dir) = tmp_db();
        repo.insert(&order(1, OrderStatus::Paid)).unwrap();
        assert_eq!(repo.find_by_id(OrderId::new(99)).unwrap(), None);
    }

    #[test]
    fn insert_duplicate_conflict() {
        let (repo, _dir) = tmp_db();
        let o = order(2, OrderStatus::Paid);
        repo.insert(&o).unwrap();
        let err = repo.insert(&o).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists));
    }

    #[test]
    fn find_all_returns_every_row_by_id() {
        let (repo, _dir) = tmp_db();
        for i in [3, 1, 2] {
            repo.insert(&order(i, OrderStatus::Delivered)).unwrap();
        }
        let ids: Vec<i64> = repo.find_all().unwrap().iter().map(|o| o.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn find_all_empty() {
        let repo = SqliteOrderRepo::in_memory().unwrap();
        assert!(repo.find_all().unwrap().is_empty());
    }

    #[test]
    fn create_assigns_ids_and_truncates_moment() {
        let repo = SqliteOrderRepo::in_memory().unwrap();
        let moment = UNIX_EPOCH + Duration::from_millis(5_500);
        let a = repo
            .create(NewOrder { moment, status: OrderStatus::WaitingPayment })
            .unwrap();
        let b = repo
            .create(NewOrder { moment, status: OrderStatus::Canceled })
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.moment, UNIX_EPOCH + Duration::from_secs(5));
        assert_eq!(repo.find_by_id(b.id).unwrap(), Some(b));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("orders.db");
        {
            let repo = SqliteOrderRepo::open_creating_dirs(&path).unwrap();
            repo.insert(&order(5, OrderStatus::Paid)).unwrap();
        }
        let repo = SqliteOrderRepo::new(&path).unwrap();
        assert_eq!(
            repo.find_by_id(OrderId::new(5)).unwrap(),
            Some(order(5, OrderStatus::Paid))
        );
    }

    #[test]
    fn unknown_status_is_repository_error() {
        let repo = SqliteOrderRepo::in_memory().unwrap();
        {
            let conn = repo.lock().unwrap();
            conn.execute(
                "INSERT INTO orders (id, moment, status) VALUES (1, 0, 'lost')",
                [],
            )
            .unwrap();
        }
        let err = repo.find_by_id(OrderId::new(1)).unwrap_err();
        assert!(matches!(err, CoreError::Repository(_)));
        assert!(repo.find_all().is_err());
    }
}
