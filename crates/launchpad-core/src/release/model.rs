use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of an upstream release as reported by the source collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseData {
    pub project: ProjectMetadata,
    /// Tag or version string of the release.
    pub version: String,
    #[serde(default)]
    pub release_notes: Option<String>,
    /// Notes of the release before this one, if any.
    #[serde(default)]
    pub previous_release_notes: Option<String>,
    /// Change records, newest first.
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    /// AI-derived defaults produced upstream; collected answers always override them.
    #[serde(default)]
    pub suggestions: ReleaseSuggestions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
}

impl CommitRecord {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSuggestions {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub app_type: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub age_legal: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    /// Suggested changelog text for the "what's new" field.
    #[serde(default)]
    pub whats_new: Option<String>,
}

impl ReleaseData {
    /// Returns at most `limit` of the most recent change records.
    pub fn recent_commits(&self, limit: usize) -> &[CommitRecord] {
        &self.commits[..self.commits.len().min(limit)]
    }

    /// The asset that will be uploaded to the store, if any.
    pub fn primary_asset(&self) -> Option<&ReleaseAsset> {
        self.assets
            .iter()
            .find(|asset| asset.name.ends_with(".apk") || asset.name.ends_with(".aab"))
            .or_else(|| self.assets.first())
    }
}
