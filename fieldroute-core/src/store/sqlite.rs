//! SQLite-backed route store.

use std::path::Path;

use rusqlite::{Connection, Row, params};

use super::{
    Route, RouteId, RouteStatus, RouteStop, RouteStore, StopId, StoreError, compute_reorder,
    now_unix,
};
use crate::solver::SolverResponse;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS routes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    agent       TEXT NOT NULL,
    status      TEXT NOT NULL,
    route_tag   TEXT NOT NULL DEFAULT '',
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    finished_at INTEGER
);

CREATE TABLE IF NOT EXISTS route_stops (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    route_id     INTEGER NOT NULL REFERENCES routes(id),
    candidate_id INTEGER NOT NULL,
    order_index  INTEGER NOT NULL,
    is_depot     INTEGER NOT NULL DEFAULT 0,
    visited      INTEGER NOT NULL DEFAULT 0,
    visited_at   INTEGER,
    visited_by   TEXT
);

CREATE INDEX IF NOT EXISTS idx_route_stops_route ON route_stops(route_id, order_index);
CREATE INDEX IF NOT EXISTS idx_routes_status ON routes(status, route_tag);
";

/// [`RouteStore`] backed by a SQLite database.
///
/// Storage is a plain file (or `:memory:` for tests); the schema is
/// created on open, so pointing the store at an empty file is enough to
/// start planning. Every mutation runs in a transaction.
///
/// # Examples
/// ```
/// use fieldroute_core::store::SqliteRouteStore;
///
/// let store = SqliteRouteStore::open_in_memory().expect("store should open");
/// ```
#[derive(Debug)]
pub struct SqliteRouteStore {
    conn: Connection,
}

impl SqliteRouteStore {
    /// Open, creating the schema if absent.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the database cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::setup(Connection::open(path)?)
    }

    /// Open a transient in-memory database.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl RouteStore for SqliteRouteStore {
    fn create_routes(
        &mut self,
        response: &SolverResponse,
        agent: &str,
        route_tag: &str,
    ) -> Result<Vec<Route>, StoreError> {
        let now = now_unix();
        let tx = self.conn.transaction()?;
        let mut created = Vec::with_capacity(response.routes.len());
        for solver_route in &response.routes {
            tx.execute(
                "INSERT INTO routes (agent, status, route_tag, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![agent, RouteStatus::Active.as_str(), route_tag, now],
            )?;
            let route_id = tx.last_insert_rowid();

            let mut waypoints: Vec<_> = solver_route.waypoints.iter().collect();
            waypoints.sort_by_key(|waypoint| waypoint.order);
            let mut stops = Vec::with_capacity(waypoints.len());
            for waypoint in waypoints {
                tx.execute(
                    "INSERT INTO route_stops (route_id, candidate_id, order_index, is_depot)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![route_id, waypoint.id, waypoint.order, waypoint.is_depot],
                )?;
                stops.push(RouteStop {
                    id: tx.last_insert_rowid(),
                    route_id,
                    candidate_id: waypoint.id,
                    order_index: waypoint.order,
                    is_depot: waypoint.is_depot,
                    visited: false,
                    visited_at: None,
                    visited_by: None,
                });
            }
            created.push(Route {
                id: route_id,
                agent: agent.to_owned(),
                status: RouteStatus::Active,
                route_tag: route_tag.to_owned(),
                created_at: now,
                updated_at: now,
                finished_at: None,
                stops,
            });
        }
        tx.commit()?;
        Ok(created)
    }

    fn list_active(&self, route_tag: Option<&str>) -> Result<Vec<Route>, StoreError> {
        let mut routes = match route_tag {
            Some(tag) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, agent, status, route_tag, created_at, updated_at, finished_at
                     FROM routes WHERE status = ?1 AND route_tag = ?2 ORDER BY id",
                )?;
                let rows =
                    stmt.query_map(params![RouteStatus::Active.as_str(), tag], route_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, agent, status, route_tag, created_at, updated_at, finished_at
                     FROM routes WHERE status = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![RouteStatus::Active.as_str()], route_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        for route in &mut routes {
            route.stops = load_stops(&self.conn, route.id)?;
        }
        Ok(routes)
    }

    fn remove_stop(&mut self, route_id: RouteId, stop_id: StopId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute(
            "DELETE FROM route_stops WHERE id = ?1 AND route_id = ?2",
            params![stop_id, route_id],
        )?;
        if affected == 0 {
            return Err(StoreError::StopNotFound { route_id, stop_id });
        }
        touch_route(&tx, route_id)?;
        tx.commit()?;
        Ok(())
    }

    fn reorder_stop(
        &mut self,
        route_id: RouteId,
        candidate_id: u64,
        new_index: u32,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        require_route(&tx, route_id)?;
        let stops = load_stops(&tx, route_id)?;
        let assignments = compute_reorder(route_id, &stops, candidate_id, new_index)?;
        for (stop_id, order_index) in assignments {
            tx.execute(
                "UPDATE route_stops SET order_index = ?1 WHERE id = ?2",
                params![order_index, stop_id],
            )?;
        }
        touch_route(&tx, route_id)?;
        tx.commit()?;
        Ok(())
    }

    fn mark_stop_visited(
        &mut self,
        route_id: RouteId,
        stop_id: StopId,
        agent: &str,
        visited: bool,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let affected = if visited {
            tx.execute(
                "UPDATE route_stops SET visited = 1, visited_at = ?1, visited_by = ?2
                 WHERE id = ?3 AND route_id = ?4",
                params![now_unix(), agent, stop_id, route_id],
            )?
        } else {
            tx.execute(
                "UPDATE route_stops SET visited = 0, visited_at = NULL, visited_by = NULL
                 WHERE id = ?1 AND route_id = ?2",
                params![stop_id, route_id],
            )?
        };
        if affected == 0 {
            return Err(StoreError::StopNotFound { route_id, stop_id });
        }
        touch_route(&tx, route_id)?;
        tx.commit()?;
        Ok(())
    }

    fn set_route_status(
        &mut self,
        route_id: RouteId,
        status: RouteStatus,
    ) -> Result<(), StoreError> {
        let now = now_unix();
        let finished_at = match status {
            RouteStatus::Active => None,
            RouteStatus::Finished | RouteStatus::Cancelled => Some(now),
        };
        let affected = self.conn.execute(
            "UPDATE routes SET status = ?1, updated_at = ?2, finished_at = ?3 WHERE id = ?4",
            params![status.as_str(), now, finished_at, route_id],
        )?;
        if affected == 0 {
            return Err(StoreError::RouteNotFound { route_id });
        }
        Ok(())
    }

    fn delete_route(&mut self, route_id: RouteId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM route_stops WHERE route_id = ?1",
            params![route_id],
        )?;
        let affected = tx.execute("DELETE FROM routes WHERE id = ?1", params![route_id])?;
        if affected == 0 {
            return Err(StoreError::RouteNotFound { route_id });
        }
        tx.commit()?;
        Ok(())
    }
}

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    let status_text: String = row.get(2)?;
    let status = RouteStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown route status {status_text}").into(),
        )
    })?;
    Ok(Route {
        id: row.get(0)?,
        agent: row.get(1)?,
        status,
        route_tag: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        finished_at: row.get(6)?,
        stops: Vec::new(),
    })
}

fn stop_from_row(row: &Row<'_>) -> rusqlite::Result<RouteStop> {
    Ok(RouteStop {
        id: row.get(0)?,
        route_id: row.get(1)?,
        candidate_id: row.get(2)?,
        order_index: row.get(3)?,
        is_depot: row.get(4)?,
        visited: row.get(5)?,
        visited_at: row.get(6)?,
        visited_by: row.get(7)?,
    })
}

fn load_stops(conn: &Connection, route_id: RouteId) -> Result<Vec<RouteStop>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, route_id, candidate_id, order_index, is_depot, visited, visited_at, visited_by
         FROM route_stops WHERE route_id = ?1 ORDER BY order_index",
    )?;
    let rows = stmt.query_map(params![route_id], stop_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn require_route(conn: &Connection, route_id: RouteId) -> Result<(), StoreError> {
    let found = conn.query_row(
        "SELECT 1 FROM routes WHERE id = ?1",
        params![route_id],
        |_| Ok(()),
    );
    match found {
        Ok(()) => Ok(()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::RouteNotFound { route_id }),
        Err(err) => Err(err.into()),
    }
}

fn touch_route(conn: &Connection, route_id: RouteId) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE routes SET updated_at = ?1 WHERE id = ?2",
        params![now_unix(), route_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::solver::{SolverRoute, Waypoint};

    fn solved(candidate_ids: &[u64]) -> SolverResponse {
        let waypoints = candidate_ids
            .iter()
            .enumerate()
            .map(|(order, id)| Waypoint {
                id: *id,
                lat: 29.5,
                lng: -98.5,
                order: order as u32,
                is_depot: order == 0,
            })
            .collect();
        SolverResponse {
            success: true,
            routes: vec![SolverRoute {
                waypoints,
                distance_km: 10.0,
            }],
            total_distance_km: 10.0,
        }
    }

    #[fixture]
    fn store() -> SqliteRouteStore {
        SqliteRouteStore::open_in_memory().expect("in-memory store should open")
    }

    #[rstest]
    fn create_and_list_round_trip(mut store: SqliteRouteStore) {
        let created = store
            .create_routes(&solved(&[100, 101, 102]), "dana", "south")
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].status, RouteStatus::Active);
        assert_eq!(created[0].stops.len(), 3);
        assert!(created[0].stops[0].is_depot);

        let listed = store.list_active(None).unwrap();
        assert_eq!(listed, created);
    }

    #[rstest]
    fn list_active_filters_by_tag(mut store: SqliteRouteStore) {
        store
            .create_routes(&solved(&[100, 101]), "dana", "south")
            .unwrap();
        store
            .create_routes(&solved(&[200, 201]), "dana", "north")
            .unwrap();

        let south = store.list_active(Some("south")).unwrap();
        assert_eq!(south.len(), 1);
        assert_eq!(south[0].route_tag, "south");
        assert!(store.list_active(Some("west")).unwrap().is_empty());
        assert_eq!(store.list_active(None).unwrap().len(), 2);
    }

    #[rstest]
    fn remove_stop_leaves_a_gap_and_keeps_the_route(mut store: SqliteRouteStore) {
        let created = store
            .create_routes(&solved(&[100, 101, 102, 103]), "dana", "")
            .unwrap();
        let route = &created[0];
        let middle = route.stops[2].id;

        store.remove_stop(route.id, middle).unwrap();

        let listed = store.list_active(None).unwrap();
        let orders: Vec<u32> = listed[0].stops.iter().map(|s| s.order_index).collect();
        assert_eq!(orders, vec![0, 1, 3]);
    }

    #[rstest]
    fn route_survives_removal_of_every_stop(mut store: SqliteRouteStore) {
        let created = store.create_routes(&solved(&[100, 101]), "dana", "").unwrap();
        let route = &created[0];
        for stop in &route.stops {
            store.remove_stop(route.id, stop.id).unwrap();
        }
        let listed = store.list_active(None).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].stops.is_empty());
    }

    #[rstest]
    fn remove_stop_rejects_unknown_stop(mut store: SqliteRouteStore) {
        let created = store.create_routes(&solved(&[100, 101]), "dana", "").unwrap();
        let result = store.remove_stop(created[0].id, 9999);
        assert!(matches!(result, Err(StoreError::StopNotFound { .. })));
    }

    #[rstest]
    fn reorder_rewrites_stop_order(mut store: SqliteRouteStore) {
        let created = store
            .create_routes(&solved(&[100, 101, 102, 103]), "dana", "")
            .unwrap();
        let route_id = created[0].id;

        store.reorder_stop(route_id, 103, 0).unwrap();

        let listed = store.list_active(None).unwrap();
        let candidates: Vec<u64> = listed[0].stops.iter().map(|s| s.candidate_id).collect();
        assert_eq!(candidates, vec![100, 103, 101, 102]);
    }

    #[rstest]
    fn failed_reorder_changes_nothing(mut store: SqliteRouteStore) {
        let created = store
            .create_routes(&solved(&[100, 101, 102]), "dana", "")
            .unwrap();
        let route_id = created[0].id;

        let result = store.reorder_stop(route_id, 999, 0);
        assert!(matches!(
            result,
            Err(StoreError::CandidateNotOnRoute { .. })
        ));

        let listed = store.list_active(None).unwrap();
        let candidates: Vec<u64> = listed[0].stops.iter().map(|s| s.candidate_id).collect();
        assert_eq!(candidates, vec![100, 101, 102]);
    }

    #[rstest]
    fn reorder_rejects_unknown_route(mut store: SqliteRouteStore) {
        let result = store.reorder_stop(42, 100, 0);
        assert!(matches!(
            result,
            Err(StoreError::RouteNotFound { route_id: 42 })
        ));
    }

    #[rstest]
    fn visit_marks_stamp_and_unmark_clears_them(mut store: SqliteRouteStore) {
        let created = store.create_routes(&solved(&[100, 101]), "dana", "").unwrap();
        let route_id = created[0].id;
        let stop_id = created[0].stops[1].id;

        store
            .mark_stop_visited(route_id, stop_id, "riley", true)
            .unwrap();
        let listed = store.list_active(None).unwrap();
        let stop = listed[0].stop(stop_id).unwrap();
        assert!(stop.visited);
        assert!(stop.visited_at.is_some());
        assert_eq!(stop.visited_by.as_deref(), Some("riley"));

        store
            .mark_stop_visited(route_id, stop_id, "riley", false)
            .unwrap();
        let listed = store.list_active(None).unwrap();
        let stop = listed[0].stop(stop_id).unwrap();
        assert!(!stop.visited);
        assert!(stop.visited_at.is_none());
        assert!(stop.visited_by.is_none());
    }

    #[rstest]
    fn finished_routes_leave_the_active_list(mut store: SqliteRouteStore) {
        let created = store.create_routes(&solved(&[100, 101]), "dana", "").unwrap();
        let route_id = created[0].id;

        store
            .set_route_status(route_id, RouteStatus::Finished)
            .unwrap();
        assert!(store.list_active(None).unwrap().is_empty());

        store
            .set_route_status(route_id, RouteStatus::Active)
            .unwrap();
        let listed = store.list_active(None).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].finished_at.is_none());
    }

    #[rstest]
    fn delete_route_removes_route_and_stops(mut store: SqliteRouteStore) {
        let created = store.create_routes(&solved(&[100, 101]), "dana", "").unwrap();
        let route_id = created[0].id;

        store.delete_route(route_id).unwrap();
        assert!(store.list_active(None).unwrap().is_empty());
        assert!(matches!(
            store.delete_route(route_id),
            Err(StoreError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn routes_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("temp dir should create");
        let path = dir.path().join("routes.db");
        {
            let mut store = SqliteRouteStore::open(&path).unwrap();
            store
                .create_routes(&solved(&[100, 101]), "dana", "south")
                .unwrap();
        }
        let store = SqliteRouteStore::open(&path).unwrap();
        let listed = store.list_active(Some("south")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].stops.len(), 2);
    }
}
