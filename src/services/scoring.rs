use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::{RecommendationConfig, ScoringWeights},
    models::{Candidate, ScoredCandidate, UserSnapshot},
    services::pool::CandidatePool,
};

/// The five per-candidate signals before weighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub history_similarity: f64,
    pub profile_similarity: f64,
    pub favorite_artist: f64,
    pub genre: f64,
    pub already_listened: f64,
}

impl Signals {
    pub fn compute(candidate: &Candidate, snapshot: &UserSnapshot) -> Self {
        let favorite_artist = match &snapshot.favorite_artist {
            Some(artist) if !artist.is_empty() && *artist == candidate.artist => 1.0,
            _ => 0.0,
        };

        // Favorite is checked first; snapshots with equal liked and disliked
        // genres are rejected when loaded.
        let genre = if snapshot.favorite_genre.as_deref() == Some(candidate.genre.as_str()) {
            1.0
        } else if snapshot.disliked_genre.as_deref() == Some(candidate.genre.as_str()) {
            -1.0
        } else {
            0.0
        };

        Self {
            history_similarity: snapshot.avg_history.cosine_similarity(&candidate.features),
            profile_similarity: snapshot.static_profile.cosine_similarity(&candidate.features),
            favorite_artist,
            genre,
            already_listened: if snapshot.has_listened(&candidate.id) {
                -1.0
            } else {
                0.0
            },
        }
    }

    pub fn weighted(&self, weights: &ScoringWeights) -> f64 {
        weights.history_similarity * self.history_similarity
            + weights.profile_similarity * self.profile_similarity
            + weights.favorite_artist * self.favorite_artist
            + weights.genre * self.genre
            + weights.already_listened * self.already_listened
    }
}

/// Computes composite scores with bounded multiplicative jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    jitter: f64,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights, jitter: f64) -> Self {
        Self { weights, jitter }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(config.weights, config.jitter)
    }

    /// Scores every pooled candidate, in pool order
    ///
    /// With a seed, the jitter sequence (and therefore the output) is fully
    /// reproducible; without one the generator is seeded from entropy.
    pub fn score(
        &self,
        pool: &CandidatePool,
        snapshot: &UserSnapshot,
        seed: Option<u64>,
    ) -> Vec<ScoredCandidate> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        pool.iter()
            .map(|candidate| {
                let weighted_score = Signals::compute(candidate, snapshot).weighted(&self.weights);
                let jitter = if self.jitter > 0.0 {
                    rng.gen_range(-self.jitter..=self.jitter)
                } else {
                    0.0
                };

                ScoredCandidate {
                    candidate: candidate.clone(),
                    weighted_score,
                    raw_score: weighted_score * (1.0 + jitter),
                    normalized_score: 0.0,
                }
            })
            .collect()
    }
}
