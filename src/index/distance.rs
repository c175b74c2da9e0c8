//! Distance metrics.
//!
//! Every metric is expressed as a distance: **lower means more similar**.
//! Query results are always sorted ascending by it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Distance between two embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`, range [0, 2]. Ignores magnitude; the usual choice
    /// for text embeddings.
    #[default]
    Cosine,

    /// Squared Euclidean distance, range [0, ∞).
    L2,

    /// `1 - a·b`. Equivalent to cosine for unit-length vectors.
    #[serde(rename = "ip")]
    InnerProduct,
}

impl DistanceMetric {
    /// Distance between `a` and `b`. Both must have the same length.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            Self::Cosine => 1.0 - cosine_similarity(a, b),
            Self::L2 => squared_l2(a, b),
            Self::InnerProduct => 1.0 - dot(a, b),
        }
    }

    /// Name used in snapshots and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::InnerProduct => "ip",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" | "cos" => Ok(Self::Cosine),
            "l2" | "euclidean" => Ok(Self::L2),
            "ip" | "inner_product" | "innerproduct" | "dot" => Ok(Self::InnerProduct),
            other => Err(format!("unknown distance metric: {other}")),
        }
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Zero vectors have similarity 0 with everything.
#[inline]
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_cosine() {
        let m = DistanceMetric::Cosine;
        assert!(close(m.distance(&[1.0, 0.0], &[2.0, 0.0]), 0.0));
        assert!(close(m.distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0));
        assert!(close(m.distance(&[1.0, 0.0], &[-1.0, 0.0]), 2.0));
        assert!(close(m.distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0));
    }

    #[test]
    fn test_l2_is_squared() {
        assert!(close(DistanceMetric::L2.distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0));
    }

    #[test]
    fn test_inner_product() {
        assert!(close(
            DistanceMetric::InnerProduct.distance(&[0.6, 0.8], &[0.6, 0.8]),
            0.0
        ));
    }

    #[test]
    fn test_parse_round_trip() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::L2,
            DistanceMetric::InnerProduct,
        ] {
            assert_eq!(metric.name().parse::<DistanceMetric>().unwrap(), metric);
        }
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
