use serde::{Deserialize, Serialize};

/// Audio features shared by tracks and user profiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
}

impl FeatureVector {
    pub fn new(danceability: f64, energy: f64, valence: f64) -> Self {
        Self {
            danceability,
            energy,
            valence,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn dot(&self, other: &FeatureVector) -> f64 {
        self.danceability * other.danceability
            + self.energy * other.energy
            + self.valence * other.valence
    }

    /// Euclidean magnitude
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Cosine similarity in [-1, 1]
    ///
    /// Returns 0.0 when either vector has zero magnitude (or a non-finite one),
    /// so callers never see NaN.
    pub fn cosine_similarity(&self, other: &FeatureVector) -> f64 {
        let denominator = self.norm() * other.norm();
        if denominator == 0.0 || !denominator.is_finite() {
            return 0.0;
        }
        self.dot(other) / denominator
    }
}

/// Per-feature maximum absolute differences for a proximity match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureThresholds {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
}

impl FeatureThresholds {
    pub fn uniform(delta: f64) -> Self {
        Self {
            danceability: delta,
            energy: delta,
            valence: delta,
        }
    }

    /// True when every feature differs by strictly less than its threshold
    pub fn admits(&self, anchor: &FeatureVector, candidate: &FeatureVector) -> bool {
        (anchor.danceability - candidate.danceability).abs() < self.danceability
            && (anchor.energy - candidate.energy).abs() < self.energy
            && (anchor.valence - candidate.valence).abs() < self.valence
    }

    pub(crate) fn all_positive(&self) -> bool {
        [self.danceability, self.energy, self.valence]
            .iter()
            .all(|d| d.is_finite() && *d > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_norm() {
        let v = FeatureVector::new(1.0, 2.0, 2.0);
        assert_eq!(v.dot(&FeatureVector::new(1.0, 0.0, 1.0)), 3.0);
        assert_eq!(v.norm(), 3.0);
    }

    #[test]
    fn test_cosine_of_parallel_vectors_is_one() {
        let a = FeatureVector::new(0.5, 0.5, 0.5);
        let b = FeatureVector::new(0.2, 0.2, 0.2);
        assert!((a.cosine_similarity(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_with_zero_vector_is_zero() {
        let zero = FeatureVector::zero();
        let v = FeatureVector::new(0.3, 0.9, 0.1);

        let forward = zero.cosine_similarity(&v);
        let backward = v.cosine_similarity(&zero);
        let both = zero.cosine_similarity(&zero);

        assert_eq!(forward, 0.0);
        assert_eq!(backward, 0.0);
        assert_eq!(both, 0.0);
        assert!(!both.is_nan());
    }

    #[test]
    fn test_cosine_of_orthogonal_vectors() {
        let a = FeatureVector::new(1.0, 0.0, 0.0);
        let b = FeatureVector::new(0.0, 1.0, 0.0);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let thresholds = FeatureThresholds::uniform(0.25);
        let anchor = FeatureVector::new(0.5, 0.5, 0.5);

        assert!(thresholds.admits(&anchor, &FeatureVector::new(0.6, 0.4, 0.7)));
        // Exactly on the boundary fails
        assert!(!thresholds.admits(&anchor, &FeatureVector::new(0.5, 0.5, 0.75)));
        // One feature out of range is enough to fail
        assert!(!thresholds.admits(&anchor, &FeatureVector::new(0.5, 0.9, 0.5)));
    }
}
