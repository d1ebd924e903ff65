//! Startup load of the working set.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::storage::UserStore;
use crate::transformed::TransformedUsers;

/// Fill `transformed` with every stored transformation that ends after `now`.
///
/// Replaces whatever the working set held. If the store cannot be queried the
/// working set is left empty and startup carries on. Returns the number of
/// entries loaded.
pub fn load_working_set(
    store: &dyn UserStore,
    transformed: &TransformedUsers,
    now: DateTime<Utc>,
) -> usize {
    match store.active_transformations(now) {
        Ok(active) => {
            transformed.replace_all(
                active
                    .into_iter()
                    .map(|row| (row.username, row.transform_end)),
            );
            let loaded = transformed.snapshot();
            info!(count = loaded.len(), users = ?loaded, "transformed users loaded from database");
            loaded.len()
        }
        Err(e) => {
            error!(error = %e, "failed to load transformed users");
            transformed.replace_all(Vec::new());
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::test_support::FlakyStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 15, 20, 0, 0).unwrap()
    }

    #[test]
    fn loads_only_future_transformations() {
        let db = Database::open_memory().unwrap();
        for name in ["soon", "gone", "never"] {
            db.insert_first_checkin(name, t0() - Duration::days(2)).unwrap();
        }
        db.set_transformation("soon", "fox", t0() - Duration::hours(1), t0() + Duration::hours(1))
            .unwrap();
        db.set_transformation("gone", "owl", t0() - Duration::hours(3), t0() - Duration::hours(1))
            .unwrap();

        let set = TransformedUsers::new();
        let loaded = load_working_set(&db, &set, t0());

        assert_eq!(loaded, 1);
        assert_eq!(set.snapshot(), vec![("soon".to_string(), t0() + Duration::hours(1))]);
    }

    #[test]
    fn end_equal_to_now_is_not_loaded() {
        let db = Database::open_memory().unwrap();
        db.insert_first_checkin("edge", t0() - Duration::days(1)).unwrap();
        db.set_transformation("edge", "fox", t0() - Duration::hours(1), t0())
            .unwrap();

        let set = TransformedUsers::new();
        assert_eq!(load_working_set(&db, &set, t0()), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn query_failure_leaves_empty_set() {
        let store = FlakyStore::new();
        store.insert_first_checkin("soon", t0()).unwrap();
        store
            .set_transformation("soon", "fox", t0(), t0() + Duration::hours(1))
            .unwrap();
        store.fail_reads(true);

        let set = TransformedUsers::new();
        set.insert("stale", t0());
        assert_eq!(load_working_set(&store, &set, t0()), 0);
        assert!(set.is_empty());
    }
}
