//! Per-run identifier generation.
//!
//! Identifiers only need to be unique enough for one smoke run to find its
//! own record; they are not secrets. Collisions are not guarded against.

use rand::Rng;
use serde::Serialize;

/// Characters identifiers are drawn from.
pub const ALPHANUMERIC: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated correlation id.
pub const CORRELATION_ID_LEN: usize = 16;

/// Length of a generated order code.
pub const ORDER_CODE_LEN: usize = 17;

/// Returns a uniformly random string of `len` characters from `[A-Z0-9]`.
///
/// Uses the thread-local RNG, which is seeded from the OS, so separate runs
/// never replay the same sequence.
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

/// The identifiers stamped onto one run's fixture and record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIdentifiers {
    /// Outbound request correlation id.
    pub correlation_id: String,
    /// Order code; also the verification lookup key.
    pub order_code: String,
}

impl RunIdentifiers {
    /// Generates a fresh identifier pair.
    pub fn generate() -> Self {
        Self {
            correlation_id: random_alphanumeric(CORRELATION_ID_LEN),
            order_code: random_alphanumeric(ORDER_CODE_LEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_charset(s: &str) -> bool {
        s.bytes().all(|b| ALPHANUMERIC.contains(&b))
    }

    #[test]
    fn test_exact_length_and_charset() {
        for len in [0, 1, 16, 17, 64] {
            let value = random_alphanumeric(len);
            assert_eq!(value.len(), len);
            assert!(in_charset(&value), "unexpected character in {value}");
        }
    }

    #[test]
    fn test_consecutive_values_differ() {
        let a = random_alphanumeric(ORDER_CODE_LEN);
        let b = random_alphanumeric(ORDER_CODE_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_pair_lengths() {
        let ids = RunIdentifiers::generate();
        assert_eq!(ids.correlation_id.len(), CORRELATION_ID_LEN);
        assert_eq!(ids.order_code.len(), ORDER_CODE_LEN);
        assert!(in_charset(&ids.correlation_id));
        assert!(in_charset(&ids.order_code));
    }

    #[test]
    fn test_serializes_camel_case() {
        let ids = RunIdentifiers {
            correlation_id: "C".to_string(),
            order_code: "O".to_string(),
        };
        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json["correlationId"], "C");
        assert_eq!(json["orderCode"], "O");
    }
}
