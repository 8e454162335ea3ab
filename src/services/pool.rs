use std::collections::HashMap;

use crate::models::{Candidate, PoolStats};

/// Deduplicated candidates in first-seen order
///
/// A track id is stored once; the first branch to propose it owns the entry
/// and later proposals are ignored.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    index: HashMap<String, usize>,
    stats: PoolStats,
}

impl CandidatePool {
    /// Merges branch outputs in the fixed order history, artist, profile
    pub fn merge(
        recent_history: &[Candidate],
        favorite_artist: &[Candidate],
        profile: &[Candidate],
    ) -> Self {
        let mut pool = Self {
            stats: PoolStats {
                recent_history: recent_history.len(),
                favorite_artist: favorite_artist.len(),
                profile: profile.len(),
                merged: 0,
            },
            ..Self::default()
        };

        for candidate in recent_history
            .iter()
            .chain(favorite_artist)
            .chain(profile)
        {
            pool.insert(candidate);
        }
        pool.stats.merged = pool.candidates.len();

        pool
    }

    fn insert(&mut self, candidate: &Candidate) {
        if self.index.contains_key(&candidate.id) {
            return;
        }
        self.index
            .insert(candidate.id.clone(), self.candidates.len());
        self.candidates.push(candidate.clone());
    }

    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.index.get(id).map(|&idx| &self.candidates[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn duplicates(&self) -> usize {
        self.stats.duplicates()
    }
}
