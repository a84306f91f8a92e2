use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Editorial section an article is filed under.
///
/// Wire values are the section names shown on the public site. Any other
/// label is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Actualidad,
    Cronicas,
    Entrevistas,
    Opinion,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Actualidad => "Actualidad",
            Category::Cronicas => "Crónicas",
            Category::Entrevistas => "Entrevistas",
            Category::Opinion => "Opinión",
            Category::Other(label) => label,
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Actualidad" => Category::Actualidad,
            "Crónicas" => Category::Cronicas,
            "Entrevistas" => Category::Entrevistas,
            "Opinión" => Category::Opinion,
            _ => Category::Other(label),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Category::from)
    }
}

/// One line of a bullfight chronicle's results sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BullfightResult {
    pub bullfighter: String,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Fields set by the front end that are not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Rich-text body (HTML).
    #[serde(default)]
    pub content: String,
    /// Cover image.
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_images: Option<Vec<String>>,
    pub category: Category,
    pub author_id: String,
    /// ISO-8601, kept verbatim.
    pub date: String,
    #[serde(default)]
    pub is_published: bool,

    // Chronicle sheet, only filled for `Category::Cronicas`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullfight_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullfight_cattle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullfight_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullfight_results: Option<Vec<BullfightResult>>,

    /// Fields set by the front end that are not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The published document: the whole dataset plus the time it was stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub articles: Vec<Article>,
    pub authors: Vec<Author>,
    #[serde(with = "iso_millis")]
    pub last_updated: DateTime<Utc>,
}

impl DocumentSnapshot {
    pub fn new(articles: Vec<Article>, authors: Vec<Author>, last_updated: DateTime<Utc>) -> Self {
        Self {
            articles,
            authors,
            last_updated,
        }
    }

    /// Canonical text form written to the remote (two-space indent).
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A snapshot as read back from the remote.
///
/// Either collection may be missing; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    #[serde(default)]
    pub articles: Option<Vec<Article>>,
    #[serde(default)]
    pub authors: Option<Vec<Author>>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
