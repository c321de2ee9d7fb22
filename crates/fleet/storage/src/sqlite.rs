//! SQLite storage implementation.

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

use crate::models::*;
use crate::schema::*;
use crate::traits::*;
use fleet_core::{DEVICE_PARTITION, DeviceAssignment, TruckAssignment, UnassignOutcome};

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// SQLite-based storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        Self::with_pool_size(database_url, 10)
    }

    /// Create a migrated in-memory storage.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool
    /// holds a single connection.
    pub fn in_memory() -> color_eyre::eyre::Result<Self> {
        let storage = Self::with_pool_size(":memory:", 1)?;
        storage.run_migrations()?;
        Ok(storage)
    }

    fn with_pool_size(database_url: &str, max_size: u32) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        conn.run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }

    fn find(&self, device_id: &str) -> color_eyre::eyre::Result<Option<DeviceAssignmentRow>> {
        let mut conn = self.conn()?;

        device_assignments::table
            .filter(device_assignments::partition_key.eq(DEVICE_PARTITION))
            .filter(device_assignments::device_id.eq(device_id))
            .select(DeviceAssignmentRow::as_select())
            .first(&mut conn)
            .optional()
            .wrap_err("failed to look up device")
    }
}

impl DeviceRegistry for SqliteStorage {
    fn assign(&self, device_id: &str, truck: &str) -> color_eyre::eyre::Result<DeviceAssignment> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let new_assignment = NewDeviceAssignment {
            partition_key: DEVICE_PARTITION,
            device_id,
            truck_number: truck,
            updated_at: now,
        };

        diesel::insert_into(device_assignments::table)
            .values(&new_assignment)
            .on_conflict((
                device_assignments::partition_key,
                device_assignments::device_id,
            ))
            .do_update()
            .set((
                device_assignments::truck_number.eq(truck),
                device_assignments::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .wrap_err("failed to store device assignment")?;

        tracing::debug!(device_id = %device_id, truck = %truck, "device assigned");

        Ok(DeviceAssignment {
            device_install_id: device_id.to_string(),
            truck_number: truck.to_string(),
            updated_at: chrono::DateTime::from_naive_utc_and_offset(now, chrono::Utc),
        })
    }

    fn resolve(&self, device_id: &str) -> color_eyre::eyre::Result<TruckAssignment> {
        let row = self.find(device_id)?.map(DeviceAssignment::from);
        Ok(TruckAssignment::from_row(row.as_ref()))
    }

    fn unassign(&self, device_id: &str) -> color_eyre::eyre::Result<UnassignOutcome> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let updated = diesel::update(
            device_assignments::table
                .filter(device_assignments::partition_key.eq(DEVICE_PARTITION))
                .filter(device_assignments::device_id.eq(device_id)),
        )
        .set((
            device_assignments::truck_number.eq(""),
            device_assignments::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .wrap_err("failed to clear device assignment")?;

        if updated == 0 {
            return Ok(UnassignOutcome::AlreadyUnassigned);
        }

        Ok(UnassignOutcome::Unassigned)
    }

    fn list_assignments(&self) -> color_eyre::eyre::Result<Vec<DeviceAssignment>> {
        let mut conn = self.conn()?;

        let rows: Vec<DeviceAssignmentRow> = device_assignments::table
            .filter(device_assignments::partition_key.eq(DEVICE_PARTITION))
            .order(device_assignments::device_id.asc())
            .select(DeviceAssignmentRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to list device assignments")?;

        Ok(rows.into_iter().map(DeviceAssignment::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_assigned_device_is_unassigned() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(
            storage.resolve("dev-unknown").unwrap(),
            TruckAssignment::Unassigned
        );
    }

    #[test]
    fn test_assign_then_resolve() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.assign("dev-abc", "4521").unwrap();
        assert_eq!(
            storage.resolve("dev-abc").unwrap(),
            TruckAssignment::Assigned("4521".into())
        );
    }

    #[test]
    fn test_reassign_replaces_truck() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.assign("dev-abc", "4521").unwrap();
        storage.assign("dev-abc", "1577").unwrap();

        assert_eq!(
            storage.resolve("dev-abc").unwrap(),
            TruckAssignment::Assigned("1577".into())
        );
        assert_eq!(storage.list_assignments().unwrap().len(), 1);
    }

    #[test]
    fn test_unassign_clears_but_keeps_row() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.assign("dev-abc", "4521").unwrap();

        assert_eq!(
            storage.unassign("dev-abc").unwrap(),
            UnassignOutcome::Unassigned
        );
        assert_eq!(
            storage.resolve("dev-abc").unwrap(),
            TruckAssignment::Unassigned
        );

        let rows = storage.list_assignments().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].truck_number, "");
    }

    #[test]
    fn test_unassign_unknown_device_is_idempotent() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(
            storage.unassign("dev-missing").unwrap(),
            UnassignOutcome::AlreadyUnassigned
        );
        assert_eq!(
            storage.unassign("dev-missing").unwrap(),
            UnassignOutcome::AlreadyUnassigned
        );
    }
}
