/// Serialize a `std::time::Duration` as a whole, non-zero count of seconds
pub mod seconds {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sec: u64 = Deserialize::deserialize(deserializer)?;

        if sec == 0 {
            return Err(de::Error::custom("duration must be at least one second"));
        }

        Ok(Duration::from_secs(sec))
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }
}
