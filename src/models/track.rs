use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::FeatureVector;

/// Candidate retrieval strategy
///
/// The declaration order is the merge order: earlier branches win when two
/// branches propose the same track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Tracks close to something the user listened to recently
    RecentHistory,
    /// Tracks close to something by an artist the user follows
    FavoriteArtist,
    /// Tracks close to the user's static profile
    Profile,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::RecentHistory, Branch::FavoriteArtist, Branch::Profile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::RecentHistory => "recent_history",
            Branch::FavoriteArtist => "favorite_artist",
            Branch::Profile => "profile",
        }
    }
}

impl Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A track proposed for recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub features: FeatureVector,
    pub genre: String,
    pub artist: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_display() {
        assert_eq!(format!("{}", Branch::RecentHistory), "recent_history");
        assert_eq!(format!("{}", Branch::FavoriteArtist), "favorite_artist");
        assert_eq!(format!("{}", Branch::Profile), "profile");
    }

    #[test]
    fn test_branch_serde_matches_display() {
        for branch in Branch::ALL {
            let json = serde_json::to_string(&branch).unwrap();
            assert_eq!(json, format!("\"{}\"", branch));
        }
    }

    #[test]
    fn test_branch_order_is_merge_order() {
        let mut branches = vec![Branch::Profile, Branch::RecentHistory, Branch::FavoriteArtist];
        branches.sort();
        assert_eq!(branches, Branch::ALL.to_vec());
    }
}
