//! Scope-bound nested-set engine.
//!
//! Every structural mutation runs in a single transaction. A failure at any
//! step drops the transaction, so the scope is left exactly as it was.

use sqlx::{AnyConnection, AnyPool};
use tracing::{debug, info};

use super::ranges::{self, FIRST_LEFT, RangeViolation};
use super::schema::{
    Bounds, Leveled, NestedRecord, NodeFields, Placement, Slot, SortOrder, TreeSchema,
};
use crate::error::{AppError, AppResult};

/// Nested-set tree over one scope of a table.
#[derive(Debug, Clone)]
pub struct NestedTree {
    pool: AnyPool,
    schema: TreeSchema,
    scope: String,
}

impl NestedTree {
    /// Create a tree engine bound to `scope` of the table described by `schema`.
    pub fn new(pool: AnyPool, schema: TreeSchema, scope: impl Into<String>) -> Self {
        Self {
            pool,
            schema,
            scope: scope.into(),
        }
    }

    /// The scope this engine is bound to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// List the subtree rooted at `start` depth-first, or the whole scope
    /// when `start` is 0.
    ///
    /// Levels are relative to `start`: the start node itself is level 0 and
    /// top-level nodes of a whole-scope listing are level 1.
    pub async fn children<T: NestedRecord>(
        &self,
        start: i64,
        order: SortOrder,
    ) -> AppResult<Vec<Leveled<T>>> {
        let mut conn = self.pool.acquire().await?;
        let s = &self.schema;

        let (rows, base) = if start == 0 {
            let sql = format!(
                "SELECT {} FROM {} WHERE {} = $1 ORDER BY {} ASC",
                T::select_list(s),
                s.table,
                s.scope,
                s.left
            );
            let rows = sqlx::query_as::<_, T>(&sql)
                .bind(&self.scope)
                .fetch_all(&mut *conn)
                .await?;
            (rows, 1)
        } else {
            let root = self.bounds(&mut conn, start).await?;
            let sql = format!(
                "SELECT {} FROM {} WHERE {} = $1 AND {} >= $2 AND {} <= $3 ORDER BY {} ASC",
                T::select_list(s),
                s.table,
                s.scope,
                s.left,
                s.right,
                s.left
            );
            let rows = sqlx::query_as::<_, T>(&sql)
                .bind(&self.scope)
                .bind(root.left)
                .bind(root.right)
                .fetch_all(&mut *conn)
                .await?;
            (rows, 0)
        };

        let mut listed = ranges::with_levels(rows, base);
        if order == SortOrder::Desc {
            listed.reverse();
        }
        Ok(listed)
    }

    /// Immediate parent of `id`, or `None` for a top-level node.
    pub async fn parent<T: NestedRecord>(&self, id: i64) -> AppResult<Option<T>> {
        let mut conn = self.pool.acquire().await?;
        let node = self.bounds(&mut conn, id).await?;
        let sql = self.ancestors_sql::<T>("DESC LIMIT 1");

        let parent = sqlx::query_as::<_, T>(&sql)
            .bind(&self.scope)
            .bind(node.left)
            .bind(node.right)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(parent)
    }

    /// Ancestors of `id`, from the top-level node down to its parent.
    pub async fn parents<T: NestedRecord>(&self, id: i64) -> AppResult<Vec<T>> {
        let mut conn = self.pool.acquire().await?;
        let node = self.bounds(&mut conn, id).await?;
        let sql = self.ancestors_sql::<T>("ASC");

        let parents = sqlx::query_as::<_, T>(&sql)
            .bind(&self.scope)
            .bind(node.left)
            .bind(node.right)
            .fetch_all(&mut *conn)
            .await?;

        Ok(parents)
    }

    /// Check the scope's ranges against the nested-set invariants.
    pub async fn verify(&self) -> AppResult<Vec<RangeViolation>> {
        let mut conn = self.pool.acquire().await?;
        let all = self.all_bounds(&mut conn).await?;
        Ok(ranges::verify(&all))
    }

    // -------------------------------------------------------------------------
    // Structural mutations
    // -------------------------------------------------------------------------

    /// Insert a new leaf as the last child of `parent_id` (or as the last
    /// top-level node when `parent_id` is 0). Returns the new id.
    pub async fn add_node<F: NodeFields + ?Sized>(
        &self,
        fields: &F,
        parent_id: i64,
    ) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        let at = if parent_id == 0 {
            self.append_point(&mut tx).await?
        } else {
            self.bounds(&mut tx, parent_id).await?.right
        };

        self.shift(&mut tx, at, 2).await?;
        let id = self.next_id(&mut tx).await?;
        fields
            .insert(
                &mut tx,
                &self.scope,
                Slot {
                    id,
                    left: at,
                    right: at + 1,
                },
            )
            .await?;

        tx.commit().await?;

        info!(scope = %self.scope, id, parent_id, left = at, "node added");
        Ok(id)
    }

    /// Remove `id`, promoting its children to its parent in their current
    /// order, and close the gap it leaves.
    pub async fn delete_node(&self, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        self.delete_node_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// [`delete_node`](Self::delete_node) on the caller's transaction, so
    /// checks made on the same connection hold until it commits.
    pub async fn delete_node_in(&self, conn: &mut AnyConnection, id: i64) -> AppResult<()> {
        let node = self.bounds(conn, id).await?;
        let s = &self.schema;

        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            s.table, s.scope, s.id
        );
        sqlx::query(&sql)
            .bind(&self.scope)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let sql = format!(
            "UPDATE {t} SET {l} = {l} - 1, {r} = {r} - 1 WHERE {sc} = $1 AND {l} > $2 AND {r} < $3",
            t = s.table,
            l = s.left,
            r = s.right,
            sc = s.scope
        );
        let promoted = sqlx::query(&sql)
            .bind(&self.scope)
            .bind(node.left)
            .bind(node.right)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        self.shift(conn, node.right + 1, -2).await?;

        info!(scope = %self.scope, id, promoted, "node deleted");
        Ok(())
    }

    /// Move the subtree rooted at `id` to become the last child of
    /// `parent_id` (or the last top-level node when `parent_id` is 0).
    ///
    /// Fails with `StructuralViolation` if `parent_id` is `id` itself or one
    /// of its descendants.
    pub async fn set_node_parent(&self, id: i64, parent_id: i64) -> AppResult<()> {
        if id == parent_id {
            return Err(AppError::StructuralViolation(format!(
                "node {id} cannot be its own parent"
            )));
        }

        let mut tx = self.pool.begin().await?;
        let node = self.bounds(&mut tx, id).await?;
        if parent_id != 0 {
            let parent = self.bounds(&mut tx, parent_id).await?;
            if node.contains(&parent) {
                return Err(AppError::StructuralViolation(format!(
                    "node {parent_id} is a descendant of node {id}"
                )));
            }
        }

        self.detach(&mut tx, node).await?;
        let at = if parent_id == 0 {
            self.append_point(&mut tx).await?
        } else {
            self.bounds(&mut tx, parent_id).await?.right
        };
        self.attach(&mut tx, node, at).await?;

        tx.commit().await?;

        info!(scope = %self.scope, id, parent_id, "node reparented");
        Ok(())
    }

    /// Move `id` (with its subtree) immediately before or after `sibling_id`.
    ///
    /// Both nodes must share a parent.
    pub async fn set_node_position(
        &self,
        id: i64,
        sibling_id: i64,
        placement: Placement,
    ) -> AppResult<()> {
        if id == sibling_id {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let node = self.bounds(&mut tx, id).await?;
        let sibling = self.bounds(&mut tx, sibling_id).await?;

        let node_parent = self.parent_bounds(&mut tx, &node).await?;
        let sibling_parent = self.parent_bounds(&mut tx, &sibling).await?;
        if node_parent.map(|p| p.id) != sibling_parent.map(|p| p.id) {
            return Err(AppError::StructuralViolation(format!(
                "nodes {id} and {sibling_id} are not siblings"
            )));
        }

        self.detach(&mut tx, node).await?;
        let sibling = self.bounds(&mut tx, sibling_id).await?;
        let at = match placement {
            Placement::Before => sibling.left,
            Placement::After => sibling.right + 1,
        };
        self.attach(&mut tx, node, at).await?;

        tx.commit().await?;

        info!(scope = %self.scope, id, sibling_id, ?placement, "node repositioned");
        Ok(())
    }

    /// Assign a range to `id` verbatim.
    ///
    /// The caller is responsible for the result being a valid tree.
    pub async fn update_position(&self, id: i64, left: i64, right: i64) -> AppResult<()> {
        let s = &self.schema;
        let sql = format!(
            "UPDATE {} SET {} = $1, {} = $2 WHERE {} = $3 AND {} = $4",
            s.table, s.left, s.right, s.scope, s.id
        );
        let updated = sqlx::query(&sql)
            .bind(left)
            .bind(right)
            .bind(&self.scope)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(AppError::not_found("node", id));
        }

        debug!(scope = %self.scope, id, left, right, "node range assigned");
        Ok(())
    }

    /// Move every node of the scope to the top level as a flat sibling
    /// list, in current left-to-right order, numbered without gaps.
    pub async fn reset_order(&self) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let current = self.all_bounds(&mut tx).await?;
        let flat = ranges::flatten(&current);

        let s = &self.schema;
        let sql = format!(
            "UPDATE {} SET {} = $1, {} = $2 WHERE {} = $3 AND {} = $4",
            s.table, s.left, s.right, s.scope, s.id
        );

        // Flattening keeps left-to-right order, so rows pair up by index.
        let mut changed = 0_u32;
        for (old, b) in current.iter().zip(&flat) {
            if old == b {
                continue;
            }
            sqlx::query(&sql)
                .bind(b.left)
                .bind(b.right)
                .bind(&self.scope)
                .bind(b.id)
                .execute(&mut *tx)
                .await?;
            changed += 1;
        }

        tx.commit().await?;

        info!(scope = %self.scope, nodes = flat.len(), changed, "tree order reset");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Range primitives (all run on the caller's connection)
    // -------------------------------------------------------------------------

    async fn bounds(&self, conn: &mut AnyConnection, id: i64) -> AppResult<Bounds> {
        let s = &self.schema;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 AND {} = $2",
            Bounds::select_list(s),
            s.table,
            s.scope,
            s.id
        );

        sqlx::query_as::<_, Bounds>(&sql)
            .bind(&self.scope)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("node", id))
    }

    async fn all_bounds(&self, conn: &mut AnyConnection) -> AppResult<Vec<Bounds>> {
        let s = &self.schema;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY {} ASC",
            Bounds::select_list(s),
            s.table,
            s.scope,
            s.left
        );

        let all = sqlx::query_as::<_, Bounds>(&sql)
            .bind(&self.scope)
            .fetch_all(&mut *conn)
            .await?;

        Ok(all)
    }

    async fn parent_bounds(
        &self,
        conn: &mut AnyConnection,
        node: &Bounds,
    ) -> AppResult<Option<Bounds>> {
        let sql = self.ancestors_sql::<Bounds>("DESC LIMIT 1");

        let parent = sqlx::query_as::<_, Bounds>(&sql)
            .bind(&self.scope)
            .bind(node.left)
            .bind(node.right)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(parent)
    }

    /// Ancestor query; binds are scope, left, right.
    fn ancestors_sql<T: NestedRecord>(&self, order_tail: &str) -> String {
        let s = &self.schema;
        format!(
            "SELECT {} FROM {} WHERE {} = $1 AND {} < $2 AND {} > $3 ORDER BY {} {}",
            T::select_list(s),
            s.table,
            s.scope,
            s.left,
            s.right,
            s.left,
            order_tail
        )
    }

    /// First free bound after the last top-level node. Ignores detached
    /// (negated) rows.
    async fn append_point(&self, conn: &mut AnyConnection) -> AppResult<i64> {
        let s = &self.schema;
        let sql = format!(
            "SELECT COALESCE(MAX({r}), $2) FROM {t} WHERE {sc} = $1 AND {r} > 0",
            r = s.right,
            t = s.table,
            sc = s.scope
        );

        let last: i64 = sqlx::query_scalar(&sql)
            .bind(&self.scope)
            .bind(FIRST_LEFT - 1)
            .fetch_one(&mut *conn)
            .await?;

        Ok(last + 1)
    }

    /// Ids are unique across scopes.
    async fn next_id(&self, conn: &mut AnyConnection) -> AppResult<i64> {
        let s = &self.schema;
        let sql = format!("SELECT COALESCE(MAX({}), 0) + 1 FROM {}", s.id, s.table);

        let id: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
        Ok(id)
    }

    /// Add `delta` to every bound `>= from`.
    async fn shift(&self, conn: &mut AnyConnection, from: i64, delta: i64) -> AppResult<()> {
        let s = &self.schema;
        for column in [s.right, s.left] {
            let sql = format!(
                "UPDATE {t} SET {c} = {c} + $1 WHERE {sc} = $2 AND {c} >= $3",
                t = s.table,
                c = column,
                sc = s.scope
            );
            sqlx::query(&sql)
                .bind(delta)
                .bind(&self.scope)
                .bind(from)
                .execute(&mut *conn)
                .await?;
        }

        debug!(scope = %self.scope, from, delta, "shifted ranges");
        Ok(())
    }

    /// Take `node`'s subtree out of the numbering by negating its bounds,
    /// then close the gap it leaves.
    async fn detach(&self, conn: &mut AnyConnection, node: Bounds) -> AppResult<()> {
        let s = &self.schema;
        let sql = format!(
            "UPDATE {t} SET {l} = -{l}, {r} = -{r} WHERE {sc} = $1 AND {l} >= $2 AND {r} <= $3",
            t = s.table,
            l = s.left,
            r = s.right,
            sc = s.scope
        );
        sqlx::query(&sql)
            .bind(&self.scope)
            .bind(node.left)
            .bind(node.right)
            .execute(&mut *conn)
            .await?;

        self.shift(conn, node.right + 1, -node.width()).await
    }

    /// Open a gap at `at` and move the detached subtree of `node` into it.
    async fn attach(&self, conn: &mut AnyConnection, node: Bounds, at: i64) -> AppResult<()> {
        self.shift(conn, at, node.width()).await?;

        let s = &self.schema;
        let sql = format!(
            "UPDATE {t} SET {l} = $1 - {l}, {r} = $1 - {r} WHERE {sc} = $2 AND {l} < 0",
            t = s.table,
            l = s.left,
            r = s.right,
            sc = s.scope
        );
        sqlx::query(&sql)
            .bind(at - node.left)
            .bind(&self.scope)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
