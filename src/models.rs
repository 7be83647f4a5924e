use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

// --- AI flow contracts ---

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    #[serde(default)]
    pub photo_data_uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Recyclability {
    Recyclable,
    NonRecyclable,
    Unsure,
}

impl Recyclability {
    pub const ALL: [Recyclability; 3] = [Self::Recyclable, Self::NonRecyclable, Self::Unsure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recyclable => "recyclable",
            Self::NonRecyclable => "non-recyclable",
            Self::Unsure => "unsure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReuseSuggestion {
    pub suggestion: String,
    pub video_search_query: String, // max 5 words
}

impl ReuseSuggestion {
    /// YouTube search link for the suggestion's tutorial query.
    pub fn video_search_url(&self) -> String {
        reqwest::Url::parse_with_params(
            "https://www.youtube.com/results",
            &[("search_query", self.video_search_query.as_str())],
        )
        .map(|u| u.to_string())
        .unwrap_or_else(|_| "https://www.youtube.com/results".to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub recyclability: Recyclability,
    pub reuse_suggestions: Vec<ReuseSuggestion>,
    pub recycle_channels: Vec<String>,
    pub donate_suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReuseSuggestionRequest {
    #[serde(default)]
    pub waste_item: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReuseSuggestionResult {
    pub suggestions: Vec<ReuseSuggestion>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageGenerationRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationResult {
    pub image_data_uri: String,
}

// --- Store records ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WasteItem {
    pub id: Uuid,
    pub name: String,
    pub category: String, // e.g. Plastic, Paper, Organic
    pub quantity: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewWasteItem {
    pub name: String,
    pub category: String,
    pub quantity: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub quantity: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    Items,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteReport {
    pub id: Uuid,
    pub classification: ClassificationResult,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub item_name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewWasteReport {
    pub classification: ClassificationResult,
    pub latitude: f64,
    pub longitude: f64,
    pub item_name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LocationType {
    #[serde(rename = "Drop-off Point")]
    DropOffPoint,
    Recycler,
    #[serde(rename = "NGO")]
    Ngo,
    #[serde(rename = "SHG")]
    Shg,
    Campaign,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MapLocation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearestLocation {
    pub location: MapLocation,
    pub distance_km: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub id: Uuid,
    pub author: String,
    pub avatar_url: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub likes: u32,
    pub comments: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewCommunityPost {
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpcycleIdea {
    pub id: Uuid,
    pub item_name: String,
    pub idea_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>, // data URI of the uploaded photo
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUpcycleIdea {
    pub item_name: String,
    pub idea_description: String,
    #[serde(default)]
    pub submitted_by: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recyclability_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&Recyclability::NonRecyclable).unwrap();
        assert_eq!(json, "\"non-recyclable\"");
        assert_eq!(Recyclability::parse("unsure"), Some(Recyclability::Unsure));
        assert_eq!(Recyclability::parse("Recyclable"), None);
    }

    #[test]
    fn video_search_url_encodes_query() {
        let s = ReuseSuggestion {
            suggestion: "Bottle planter".into(),
            video_search_query: "diy bottle planter & pots".into(),
        };
        assert_eq!(
            s.video_search_url(),
            "https://www.youtube.com/results?search_query=diy+bottle+planter+%26+pots"
        );
    }

    #[test]
    fn location_type_keeps_display_names() {
        let loc: MapLocation = serde_json::from_str(
            r#"{"id":"9","name":"Hub","type":"Drop-off Point","latitude":1.0,"longitude":2.0}"#,
        )
        .unwrap();
        assert_eq!(loc.location_type, LocationType::DropOffPoint);
        assert_eq!(loc.address, None);
    }
}
