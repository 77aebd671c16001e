//! Content tree operations.
//!
//! The tree is stored flattened: every scalar or array lives in its own
//! `nodes` row keyed by its full path, objects exist only implicitly through
//! their leaves. Writing `null` (or an empty object) therefore removes a
//! subtree, and a leaf can never have children.

use folio_shared::StorePath;
use rusqlite::{params, Transaction};
use serde_json::{Map, Value};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Reassemble the value stored at `path`, or `Null` if nothing is there.
    pub fn read_node(&self, path: &StorePath) -> Result<Value> {
        let rows = if path.is_root() {
            let mut stmt = self
                .conn()
                .prepare("SELECT path, value FROM nodes ORDER BY path ASC")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let collected: Vec<(String, String)> =
                rows.collect::<std::result::Result<_, _>>()?;
            collected
        } else {
            let (exact, lower, upper) = subtree_bounds(path);
            let mut stmt = self.conn().prepare(
                "SELECT path, value FROM nodes
                 WHERE path = ?1 OR (path > ?2 AND path < ?3)
                 ORDER BY path ASC",
            )?;
            let rows = stmt.query_map(params![exact, lower, upper], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            let collected: Vec<(String, String)> =
                rows.collect::<std::result::Result<_, _>>()?;
            collected
        };

        assemble(path, rows)
    }

    pub fn node_exists(&self, path: &StorePath) -> Result<bool> {
        if path.is_root() {
            let found: Option<i64> = self
                .conn()
                .query_row("SELECT 1 FROM nodes LIMIT 1", [], |row| row.get(0))
                .map(Some)
                .or_else(no_rows)?;
            return Ok(found.is_some());
        }

        let (exact, lower, upper) = subtree_bounds(path);
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM nodes WHERE path = ?1 OR (path > ?2 AND path < ?3) LIMIT 1",
                params![exact, lower, upper],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(no_rows)?;
        Ok(found.is_some())
    }

    /// Overwrite the subtree at `path` with `value`.
    pub fn set_node(&mut self, path: &StorePath, value: &Value) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        replace_subtree(&tx, path, value)?;
        tx.commit()?;
        Ok(())
    }

    /// Shallow merge: each key of `patch` replaces that child of `path`,
    /// every other child is left untouched. Keys may be relative paths.
    ///
    /// Returns the paths that were replaced.
    pub fn merge_node(&mut self, path: &StorePath, patch: &Value) -> Result<Vec<StorePath>> {
        let Value::Object(entries) = patch else {
            return Err(StoreError::InvalidValue(format!(
                "update at '{path}' needs an object, got {}",
                kind_of(patch)
            )));
        };

        let mut targets = Vec::with_capacity(entries.len());
        for key in entries.keys() {
            let relative = StorePath::parse(key)?;
            if relative.is_root() {
                return Err(StoreError::InvalidValue("empty key in update".to_string()));
            }
            targets.push(path.join(&relative));
        }

        let tx = self.conn_mut().transaction()?;
        for (target, value) in targets.iter().zip(entries.values()) {
            replace_subtree(&tx, target, value)?;
        }
        tx.commit()?;

        Ok(targets)
    }

    pub fn remove_node(&mut self, path: &StorePath) -> Result<()> {
        self.set_node(path, &Value::Null)
    }
}

fn replace_subtree(tx: &Transaction<'_>, path: &StorePath, value: &Value) -> Result<()> {
    if path.is_root() && !(value.is_object() || value.is_null()) {
        return Err(StoreError::InvalidValue(format!(
            "the root can only hold an object, got {}",
            kind_of(value)
        )));
    }

    if path.is_root() {
        tx.execute("DELETE FROM nodes", [])?;
    } else {
        let (exact, lower, upper) = subtree_bounds(path);
        tx.execute(
            "DELETE FROM nodes WHERE path = ?1 OR (path > ?2 AND path < ?3)",
            params![exact, lower, upper],
        )?;

        // A leaf sitting on an ancestor is replaced by the new subtree.
        if !is_empty(value) {
            let mut current = path.clone();
            while let Ok(parent) = current.parent() {
                if parent.is_root() {
                    break;
                }
                tx.execute("DELETE FROM nodes WHERE path = ?1", params![parent.to_string()])?;
                current = parent;
            }
        }
    }

    insert_leaves(tx, path, value)
}

fn insert_leaves(tx: &Transaction<'_>, path: &StorePath, value: &Value) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Object(map) => {
            for (key, child) in map {
                insert_leaves(tx, &path.child(key)?, child)?;
            }
            Ok(())
        }
        leaf => {
            tx.execute(
                "INSERT OR REPLACE INTO nodes (path, value) VALUES (?1, ?2)",
                params![path.to_string(), serde_json::to_string(leaf)?],
            )?;
            Ok(())
        }
    }
}

/// `(exact, lower, upper)` such that every descendant key `k` of `path`
/// satisfies `lower < k < upper`. `'0'` is the byte right after `'/'`.
fn subtree_bounds(path: &StorePath) -> (String, String, String) {
    let exact = path.to_string();
    let lower = format!("{exact}/");
    let upper = format!("{exact}0");
    (exact, lower, upper)
}

fn assemble(base: &StorePath, rows: Vec<(String, String)>) -> Result<Value> {
    let depth = base.segments().len();
    let mut root = Value::Null;

    for (path, raw) in rows {
        let leaf: Value = serde_json::from_str(&raw)?;
        let segments: Vec<&str> = path.split('/').collect();
        let relative = segments.get(depth..).unwrap_or_default();
        if relative.is_empty() {
            return Ok(leaf);
        }
        insert_at(&mut root, relative, leaf);
    }

    Ok(root)
}

fn insert_at(node: &mut Value, relative: &[&str], leaf: Value) {
    match relative.split_first() {
        None => *node = leaf,
        Some((head, rest)) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                let child = map.entry((*head).to_string()).or_insert(Value::Null);
                insert_at(child, rest, leaf);
            }
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.values().all(is_empty),
        _ => false,
    }
}

fn no_rows(e: rusqlite::Error) -> rusqlite::Result<Option<i64>> {
    match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
