//! Network-condition simulation hook.
//!
//! An optional latency applied once before a response is written, either a
//! fixed delay or a random delay within a range.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Latency {
    /// Fixed delay in milliseconds.
    Fixed(u64),
    /// Random delay within range.
    Range {
        #[serde(rename = "min")]
        min_ms: u64,
        #[serde(rename = "max")]
        max_ms: u64,
    },
}

impl Latency {
    pub fn duration_ms(&self) -> u64 {
        match self {
            Latency::Fixed(ms) => *ms,
            Latency::Range { min_ms, max_ms } => {
                use rand::Rng;
                if max_ms > min_ms {
                    rand::thread_rng().gen_range(*min_ms..=*max_ms)
                } else {
                    *min_ms
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NetworkConditions {
    #[serde(default)]
    pub latency: Option<Latency>,
}

impl NetworkConditions {
    /// Sleep for the configured latency, if any. The random draw happens
    /// before the await point (ThreadRng is not Send).
    pub async fn apply(&self) {
        let Some(ref latency) = self.latency else {
            return;
        };
        let ms = latency.duration_ms();
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_latency() {
        let latency = Latency::Fixed(100);
        assert_eq!(latency.duration_ms(), 100);
    }

    #[test]
    fn test_range_latency() {
        let latency = Latency::Range {
            min_ms: 50,
            max_ms: 150,
        };
        for _ in 0..10 {
            let ms = latency.duration_ms();
            assert!((50..=150).contains(&ms));
        }
    }

    #[test]
    fn test_latency_serde() {
        let latency: Latency = serde_yaml::from_str("250").unwrap();
        assert!(matches!(latency, Latency::Fixed(250)));

        let latency: Latency = serde_yaml::from_str("min: 10\nmax: 20").unwrap();
        assert!(matches!(
            latency,
            Latency::Range {
                min_ms: 10,
                max_ms: 20
            }
        ));
    }

    #[tokio::test]
    async fn test_apply_without_latency_is_noop() {
        NetworkConditions::default().apply().await;
    }
}
