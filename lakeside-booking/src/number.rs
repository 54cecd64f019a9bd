use chrono::{DateTime, Utc};
use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;

/// Produces guest-facing booking numbers: `{PREFIX}-{YYYYMMDD}-{XXXX}`.
///
/// The suffix is random, so two numbers can collide; the store's unique
/// constraint is the source of truth and callers regenerate on a clash.
#[derive(Debug, Clone)]
pub struct BookingNumberGenerator {
    prefix: String,
}

impl BookingNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn generate(&self, created_at: DateTime<Utc>) -> String {
        self.generate_with(&mut rand::thread_rng(), created_at)
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R, created_at: DateTime<Utc>) -> String {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
            .collect();
        format!("{}-{}-{}", self.prefix, created_at.format("%Y%m%d"), suffix)
    }
}

impl Default for BookingNumberGenerator {
    fn default() -> Self {
        Self::new("BK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 20, 23, 59, 0).unwrap();
        let number = BookingNumberGenerator::default().generate(at);

        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "BK");
        assert_eq!(parts[1], "20261020");
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].bytes().all(|b| SUFFIX_CHARSET.contains(&b)));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let generator = BookingNumberGenerator::new("LKS");
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap();

        let a = generator.generate_with(&mut StdRng::seed_from_u64(7), at);
        let b = generator.generate_with(&mut StdRng::seed_from_u64(7), at);
        assert_eq!(a, b);
        assert!(a.starts_with("LKS-20260102-"));
    }
}
