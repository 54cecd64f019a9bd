use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Guest contact data (email, phone) that must not show up in log lines.
///
/// `Debug` and `Display` print a fixed mask; serialization writes the real
/// value because API responses and outbound events need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_formatting() {
        let phone = Masked("+254711223344".to_string());
        assert_eq!(format!("{:?}", phone), "********");
        assert_eq!(phone.to_string(), "********");
        assert_eq!(phone.expose(), "+254711223344");
    }

    #[test]
    fn test_masked_round_trips_transparently() {
        let email: Masked<String> = serde_json::from_str("\"guest@example.com\"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"guest@example.com\"");
    }
}
