//! Deterministic point identifiers.

use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

/// Point id for the `index`-th chunk of `file_name`.
///
/// Re-storing identical chunks overwrites instead of duplicating.
pub fn chunk_point_id(file_name: &str, index: usize, text: &str) -> Uuid {
    let text_hash = Uuid::new_v5(&Uuid::NAMESPACE_OID, text.as_bytes());
    stable_uuid(&format!("{file_name}#{index}#{}", text_hash.simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_position_sensitive() {
        let a = chunk_point_id("a.pdf", 0, "hello");
        assert_eq!(a, chunk_point_id("a.pdf", 0, "hello"));
        assert_ne!(a, chunk_point_id("a.pdf", 1, "hello"));
        assert_ne!(a, chunk_point_id("b.pdf", 0, "hello"));
        assert_ne!(a, chunk_point_id("a.pdf", 0, "hello!"));
    }
}
