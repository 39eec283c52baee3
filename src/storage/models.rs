use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of an entry title or template name, in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Default mood intensity when none is chosen
pub const DEFAULT_MOOD_INTENSITY: u8 = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Title must be at most {max} characters (got {actual})")]
    TitleTooLong { max: usize, actual: usize },
    #[error("Content must not be empty")]
    EmptyContent,
    #[error("Mood intensity must be between 1 and 5 (got {0})")]
    MoodIntensityOutOfRange(u8),
    #[error("Unknown mood: {0}")]
    UnknownMood(String),
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_CHARS,
            actual: len,
        });
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

fn validate_intensity(intensity: u8) -> Result<(), ValidationError> {
    if !(1..=5).contains(&intensity) {
        return Err(ValidationError::MoodIntensityOutOfRange(intensity));
    }
    Ok(())
}

/// Trim tags, drop empty ones and remove duplicates (first occurrence wins)
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Excited,
    Peaceful,
    Neutral,
    Sad,
    Anxious,
    Angry,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Excited,
        Mood::Peaceful,
        Mood::Neutral,
        Mood::Sad,
        Mood::Anxious,
        Mood::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Excited => "excited",
            Mood::Peaceful => "peaceful",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Angry => "angry",
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownMood(s.to_string()))
    }
}

/// A single journal record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    pub mood_intensity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Check the invariants an entry must hold before it is written
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        validate_intensity(self.mood_intensity)
    }

    /// Apply a partial update. The caller re-validates the result.
    pub fn apply(&mut self, patch: EntryPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(mood) = patch.mood {
            self.mood = mood;
        }
        if let Some(intensity) = patch.mood_intensity {
            self.mood_intensity = intensity;
        }
        if let Some(notes) = patch.mood_notes {
            self.mood_notes = notes;
        }
        self.updated_at = Utc::now();
    }

    /// Case-insensitive substring match over title and content
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.content.to_lowercase().contains(&query)
    }
}

/// Validated fields for a new entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    title: String,
    content: String,
    tags: Vec<String>,
    is_favorite: bool,
    mood: Option<Mood>,
    mood_intensity: u8,
    mood_notes: Option<String>,
}

impl NewEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        let content = content.into();
        validate_title(&title)?;
        validate_content(&content)?;
        Ok(Self {
            title,
            content,
            tags: Vec::new(),
            is_favorite: false,
            mood: None,
            mood_intensity: DEFAULT_MOOD_INTENSITY,
            mood_notes: None,
        })
    }

    /// Start a new entry whose content is seeded from a template
    pub fn from_template(title: impl Into<String>, template: &Template) -> Result<Self, ValidationError> {
        Self::new(title, template.content.clone())
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    pub fn with_mood(mut self, mood: Mood, intensity: u8) -> Result<Self, ValidationError> {
        validate_intensity(intensity)?;
        self.mood = Some(mood);
        self.mood_intensity = intensity;
        Ok(self)
    }

    pub fn with_mood_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.mood_notes = if notes.trim().is_empty() { None } else { Some(notes) };
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Turn the validated fields into a stored entry with a fresh id
    pub fn into_entry(self) -> Entry {
        let now = Utc::now();
        Entry {
            id: Uuid::new_v4(),
            title: self.title,
            content: self.content,
            tags: self.tags,
            is_favorite: self.is_favorite,
            mood: self.mood,
            mood_intensity: self.mood_intensity,
            mood_notes: self.mood_notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an entry; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    /// `Some(None)` clears the mood
    pub mood: Option<Option<Mood>>,
    pub mood_intensity: Option<u8>,
    /// `Some(None)` clears the notes
    pub mood_notes: Option<Option<String>>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.is_favorite.is_none()
            && self.mood.is_none()
            && self.mood_intensity.is_none()
            && self.mood_notes.is_none()
    }
}

/// Seed content for new entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Result<Self, ValidationError> {
        let template = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content: content.into(),
            created_at: Utc::now(),
        };
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            _ => Err(ValidationError::UnknownTheme(s.to_string())),
        }
    }
}

/// Singleton preferences record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl UserPreferences {
    /// Replace the theme and merge settings; a `null` value removes the key
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        for (key, value) in patch.settings {
            if value.is_null() {
                self.settings.remove(&key);
            } else {
                self.settings.insert(key, value);
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_rejects_empty_fields() {
        assert_eq!(NewEntry::new("", "body"), Err(ValidationError::EmptyTitle));
        assert_eq!(NewEntry::new("Title", "   "), Err(ValidationError::EmptyContent));
    }

    #[test]
    fn test_new_entry_rejects_long_title() {
        let title = "x".repeat(101);
        assert!(matches!(
            NewEntry::new(title, "body"),
            Err(ValidationError::TitleTooLong { actual: 101, .. })
        ));
        assert!(NewEntry::new("x".repeat(100), "body").is_ok());
    }

    #[test]
    fn test_tags_are_a_set() {
        let entry = NewEntry::new("Title", "body")
            .unwrap()
            .with_tags(["work", " work ", "", "life"])
            .into_entry();
        assert_eq!(entry.tags, vec!["work".to_string(), "life".to_string()]);
    }

    #[test]
    fn test_mood_intensity_range() {
        let base = NewEntry::new("Title", "body").unwrap();
        assert!(base.clone().with_mood(Mood::Happy, 0).is_err());
        assert!(base.clone().with_mood(Mood::Happy, 6).is_err());
        let entry = base.with_mood(Mood::Sad, 5).unwrap().into_entry();
        assert_eq!(entry.mood, Some(Mood::Sad));
        assert_eq!(entry.mood_intensity, 5);
    }

    #[test]
    fn test_patch_and_revalidate() {
        let mut entry = NewEntry::new("Title", "body").unwrap().into_entry();
        let created = entry.created_at;
        entry.apply(EntryPatch {
            content: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(entry.validate(), Err(ValidationError::EmptyContent));
        assert_eq!(entry.created_at, created);
    }

    #[test]
    fn test_mood_parse() {
        assert_eq!("Peaceful".parse::<Mood>().unwrap(), Mood::Peaceful);
        assert!("grumpy".parse::<Mood>().is_err());
    }

    #[test]
    fn test_preferences_default_and_merge() {
        let mut prefs = UserPreferences::default();
        assert_eq!(prefs.theme, Theme::Dark);

        let mut settings = serde_json::Map::new();
        settings.insert("autosaveDelayMs".into(), serde_json::json!(2000));
        prefs.apply(PreferencesPatch {
            theme: Some(Theme::Light),
            settings,
        });
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.settings["autosaveDelayMs"], serde_json::json!(2000));

        let mut removal = serde_json::Map::new();
        removal.insert("autosaveDelayMs".into(), serde_json::Value::Null);
        prefs.apply(PreferencesPatch {
            theme: None,
            settings: removal,
        });
        assert!(prefs.settings.is_empty());
    }
}
