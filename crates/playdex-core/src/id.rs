//! Surrogate identifier generation and formatting.

/// Size of an identifier in bytes (UUID-shaped).
pub const ID_SIZE: usize = 16;

/// Generate a new identifier (UUID v4 bytes).
///
/// Combines a nanosecond timestamp with a process-global counter, so ids
/// are unique within a process even when generated in the same instant.
/// Ids are never reused; a deleted row's id stays retired.
pub fn generate() -> [u8; ID_SIZE] {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_nanos() as u64;

    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    let mut id = [0u8; ID_SIZE];
    id[..8].copy_from_slice(&now.to_le_bytes());
    id[8..16].copy_from_slice(&counter.to_le_bytes());

    // Set UUID version 4 bits
    id[6] = (id[6] & 0x0f) | 0x40;
    id[8] = (id[8] & 0x3f) | 0x80;

    id
}

/// Format an id as lowercase hex for logs and error messages.
pub fn hex(id: &[u8; ID_SIZE]) -> String {
    id.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_version_bits() {
        let id = generate();
        assert_eq!(id[6] & 0xf0, 0x40);
        assert_eq!(id[8] & 0xc0, 0x80);
    }

    #[test]
    fn test_hex_formatting() {
        let id = [0xabu8; ID_SIZE];
        let text = hex(&id);
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c == 'a' || c == 'b'));
    }
}
