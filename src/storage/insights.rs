use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::models::{Entry, Mood};

/// Number of recent mood points kept for the trend
pub const MOOD_TREND_POINTS: usize = 14;

impl Mood {
    /// Coarse valence used to plot moods on one axis
    pub fn score(&self) -> u8 {
        match self {
            Mood::Excited => 5,
            Mood::Happy => 4,
            Mood::Peaceful => 3,
            Mood::Neutral => 2,
            Mood::Sad | Mood::Anxious | Mood::Angry => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoodCount {
    pub mood: Mood,
    pub count: usize,
}

/// One entry on the mood trend
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoodPoint {
    pub entry_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub mood: Mood,
    pub intensity: u8,
    pub score: u8,
}

/// Mood statistics over a set of entries
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MoodInsights {
    pub total_entries: usize,
    pub entries_with_mood: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_mood: Option<Mood>,
    /// Most frequent first; only moods that were recorded
    pub distribution: Vec<MoodCount>,
    /// Oldest first
    pub trend: Vec<MoodPoint>,
}

impl MoodInsights {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut with_mood: Vec<(&Entry, Mood)> = entries
            .iter()
            .filter_map(|e| e.mood.map(|m| (e, m)))
            .collect();

        // Ties keep the order of Mood::ALL
        let mut distribution: Vec<MoodCount> = Mood::ALL
            .into_iter()
            .map(|mood| MoodCount {
                mood,
                count: with_mood.iter().filter(|(_, m)| *m == mood).count(),
            })
            .filter(|c| c.count > 0)
            .collect();
        distribution.sort_by(|a, b| b.count.cmp(&a.count));

        with_mood.sort_by_key(|(e, _)| e.created_at);
        let skip = with_mood.len().saturating_sub(MOOD_TREND_POINTS);
        let trend = with_mood[skip..]
            .iter()
            .map(|(e, mood)| MoodPoint {
                entry_id: e.id,
                created_at: e.created_at,
                mood: *mood,
                intensity: e.mood_intensity,
                score: mood.score(),
            })
            .collect();

        Self {
            total_entries: entries.len(),
            entries_with_mood: with_mood.len(),
            dominant_mood: distribution.first().map(|c| c.mood),
            distribution,
            trend,
        }
    }

    pub fn count_for(&self, mood: Mood) -> usize {
        self.distribution
            .iter()
            .find(|c| c.mood == mood)
            .map_or(0, |c| c.count)
    }
}
