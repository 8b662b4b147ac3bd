use serde::{Deserialize, Serialize};

/// Tag on a card file as sent by the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileKind {
    IMAGE,
    VIDEO,
    #[serde(other)]
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::IMAGE => "IMAGE",
            FileKind::VIDEO => "VIDEO",
            FileKind::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewImage {
    #[serde(rename = "baseUrl", default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoInfo {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardFile {
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub video: Option<VideoInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptionPointer {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    #[serde(rename = "descriptionPointers", default)]
    pub description_pointers: Vec<DescriptionPointer>,
    #[serde(default)]
    pub files: Vec<CardFile>,
}

/// Descriptor nested in a popular entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeInfo {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub exam: Vec<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(rename = "markedAsNew", default)]
    pub marked_as_new: bool,
    #[serde(rename = "isCombo", default)]
    pub is_combo: bool,
    #[serde(default)]
    pub card: Option<Card>,
    #[serde(rename = "previewImage", default)]
    pub preview_image: Option<PreviewImage>,
    #[serde(rename = "previewImageUrl", default)]
    pub preview_image_url: Option<String>,
    #[serde(rename = "fomoIcons", default)]
    pub fomo_icons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopularBatchEntry {
    #[serde(rename = "typeId")]
    pub type_id: String,
    #[serde(rename = "typeInfo")]
    pub type_info: TypeInfo,
}

impl PopularBatchEntry {
    /// Identifier used by the detail link.
    pub fn detail_id(&self) -> &str {
        self.type_info.id.as_deref().unwrap_or(&self.type_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub exam: Vec<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "previewImage", default)]
    pub preview_image: Option<PreviewImage>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One chunk of the paginated batch listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchPage {
    #[serde(default)]
    pub batches: Vec<BatchEntry>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    pub page: u32,
    #[serde(default)]
    pub total: u64,
}
