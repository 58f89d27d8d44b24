use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique player id. Ids are never reused, so a late event for a
/// departed player cannot hit a newcomer.
pub fn next_player_id() -> u64 {
    NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Random id for correlating connection logs.
pub fn conn_id() -> u64 {
    rand::thread_rng().r#gen()
}

/// Short random match id for matches created without one.
pub fn match_id() -> String {
    format!("m-{:08x}", rand::thread_rng().r#gen::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_player_ids_drawn_then_they_strictly_increase() {
        let first = next_player_id();
        let second = next_player_id();
        assert!(second > first);
    }

    #[test]
    fn when_match_id_generated_then_it_has_prefix() {
        let id = match_id();
        assert!(id.starts_with("m-"));
        assert_eq!(id.len(), 10);
    }
}
