#![forbid(unsafe_code)]

//! Key identifiers for keys within a keyset.

use rand::RngCore;

/// A random non-zero key id with the most significant bit cleared.
pub fn rand_key_id() -> u32 {
    let mut rng = rand::thread_rng();
    loop {
        let id = rng.next_u32() & 0x7fff_ffff;
        if id != 0 {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_key_id_range() {
        for _ in 0..64 {
            let id = rand_key_id();
            assert_ne!(id, 0);
            assert_eq!(id & 0x8000_0000, 0);
        }
    }
}
