use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::media::MediaKind;

// -- Media --

/// Public view of a media record. Deliberately has no field for the
/// content identifier, the thumbnail reference or the uploader address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub media_type: MediaKind,
    pub mime_type: String,
    pub file_size: Option<u64>,
    pub tags: Option<String>,
    pub source_info: Option<String>,
    pub lost_date: Option<String>,
    pub found_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_count: u64,
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub id: String,
    pub title: String,
    pub media_type: MediaKind,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_media: u64,
    pub total_views: u64,
    pub by_type: BTreeMap<String, u64>,
}

/// PATCH body for a media record. Only these fields are mutable.
///
/// For the optional columns, an absent key leaves the value alone while an
/// explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMediaRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub source_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub lost_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub found_date: Option<Option<String>>,
    pub is_public: Option<bool>,
}

// -- Collections --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_image_cid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: CollectionResponse,
    pub media: Vec<MediaResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCollectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image_cid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCollectionRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_image_cid: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddMediaRequest {
    #[serde(rename = "mediaId")]
    pub media_id: Option<String>,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ipfs: String,
    pub timestamp: DateTime<Utc>,
}

/// Distinguishes `"field": null` (Some(None)) from a missing key (None).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_from_absent() {
        let req: UpdateMediaRequest =
            serde_json::from_str(r#"{"description": null, "title": "Pilot"}"#).unwrap();
        assert_eq!(req.title, Some(Some("Pilot".to_string())));
        assert_eq!(req.description, Some(None));
        assert_eq!(req.tags, None);
        assert_eq!(req.is_public, None);
    }

    #[test]
    fn collection_update_keeps_null_name() {
        let req: UpdateCollectionRequest = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(req.name, Some(None));
        let req: UpdateCollectionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.name, None);
    }

    #[test]
    fn update_rejects_non_whitelisted_fields() {
        let res = serde_json::from_str::<UpdateMediaRequest>(r#"{"cid": "bafy"}"#);
        assert!(res.is_err());
        let res = serde_json::from_str::<UpdateMediaRequest>(r#"{"view_count": 9000}"#);
        assert!(res.is_err());
    }

    #[test]
    fn paginated_response_uses_camel_case() {
        let page = PaginatedResponse::<u32> {
            data: vec![],
            total: 45,
            page: 2,
            total_pages: 3,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert!(json.get("total_pages").is_none());
    }
}
