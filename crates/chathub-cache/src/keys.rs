//! Cache key builders for all data-layer cache entries.
//!
//! Centralising key construction prevents typos and makes it easy to find
//! every key the data layer uses. The `entity_cache:`, `table_generation:`
//! and `query_cache:` namespaces are shared with existing deployments and
//! must not change shape.

use xxhash_rust::xxh3::Xxh3;

use chathub_core::types::value::SqlValue;

/// Cache key for a single entity by table and id.
pub fn entity_key(table: &str, id: i64) -> String {
    format!("entity_cache:{table}:{id}")
}

/// Prefix covering every cached entity of a table.
pub fn entity_prefix(table: &str) -> String {
    format!("entity_cache:{table}:")
}

/// Cache key for a cached existence boolean.
///
/// Existence booleans live outside `entity_cache:` so a cached `0`/`1`
/// can never be mistaken for a serialized entity.
pub fn exists_key(table: &str, id: i64) -> String {
    format!("entity_exists:{table}:{id}")
}

/// Prefix covering every cached existence boolean of a table.
pub fn exists_prefix(table: &str) -> String {
    format!("entity_exists:{table}:")
}

/// Cache key for a table's generation counter.
pub fn generation_key(table: &str) -> String {
    format!("table_generation:{table}")
}

/// Cache key for a query result list.
///
/// Pure function of its inputs: the rendered SQL template, the hash of the
/// generation counters of every involved table, and the hash of the bound
/// parameters.
pub fn query_key(sql: &str, generation_hash: u64, params_hash: u64) -> String {
    format!("query_cache:{sql}:gen={generation_hash:016x}:params={params_hash:016x}")
}

/// Hash the generation counters of every table a query touches, in the
/// order given (base table first, joined tables after).
pub fn generation_hash(generations: &[(&str, u64)]) -> u64 {
    let mut hasher = Xxh3::new();
    for (table, generation) in generations {
        hasher.update(table.as_bytes());
        hasher.update(b"=");
        hasher.update(generation.to_string().as_bytes());
        hasher.update(b";");
    }
    hasher.digest()
}

/// Hash bound statement parameters in bind order.
///
/// The encoding tags each value with its variant so `Null` and empty text,
/// or `1` and `true`, hash differently.
pub fn params_hash(params: &[SqlValue]) -> u64 {
    let mut hasher = Xxh3::new();
    for value in params {
        hasher.update(value.kind_tag().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(value.canonical_text().as_bytes());
        hasher.update(b"\x1e");
    }
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_shape() {
        assert_eq!(entity_key("users", 6), "entity_cache:users:6");
        assert_eq!(entity_prefix("users"), "entity_cache:users:");
    }

    #[test]
    fn test_generation_key_shape() {
        assert_eq!(generation_key("users"), "table_generation:users");
    }

    #[test]
    fn test_query_key_is_pure() {
        let sql = "SELECT id FROM users WHERE tag = $1";
        let a = query_key(sql, 1, 2);
        let b = query_key(sql, 1, 2);
        assert_eq!(a, b);
        assert!(a.starts_with("query_cache:SELECT id FROM users WHERE tag = $1:gen="));
    }

    #[test]
    fn test_distinct_params_yield_distinct_keys() {
        let sql = "SELECT id FROM users WHERE tag = $1";
        let g = generation_hash(&[("users", 0)]);
        let p1 = params_hash(&[SqlValue::Text("roma228".into())]);
        let p2 = params_hash(&[SqlValue::Text("other".into())]);
        assert_ne!(p1, p2);
        assert_ne!(query_key(sql, g, p1), query_key(sql, g, p2));
    }

    #[test]
    fn test_generation_hash_changes_with_counter() {
        let before = generation_hash(&[("users", 3), ("messages", 7)]);
        let after = generation_hash(&[("users", 4), ("messages", 7)]);
        assert_ne!(before, after);
    }

    #[test]
    fn test_params_hash_distinguishes_kinds() {
        let as_int = params_hash(&[SqlValue::BigInt(1)]);
        let as_text = params_hash(&[SqlValue::Text("1".into())]);
        assert_ne!(as_int, as_text);
    }
}
