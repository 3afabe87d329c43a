//! Random id generation used for MCP session ids (spec §3 MCPSession: opaque
//! 128-bit hex) and internal request ids (spec §4.5: a small allocator that
//! scans `[0, 10^6)` for an empty slot).

use rand::RngCore;

/// A 128-bit identifier rendered as 32 lowercase hex characters, matching
/// the `[0-9a-f]{32}` shape required by spec P12.
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn session_ids_match_expected_shape_and_are_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let id = new_session_id();
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            assert!(seen.insert(id), "session ids must be pairwise distinct");
        }
    }
}
