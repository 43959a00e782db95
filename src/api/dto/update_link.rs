//! DTO for the link update endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::serde_as;
use validator::Validate;

use crate::application::services::link_service::UpdateLink;
use crate::domain::entities::{AbTestConfig, GeoRedirects, SmartRedirects};

/// Request body for `PATCH /api/links/{code}`.
///
/// Only provided fields change. Clearable fields distinguish three states:
///
/// - **Absent** → leave the stored value unchanged
/// - **`null`** → clear it
/// - **Value** → set it
///
/// `password` is a plain option: `""` removes the password.
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub original_url: Option<String>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub smart_redirects: Option<Option<SmartRedirects>>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub geo_redirects: Option<Option<GeoRedirects>>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub ab_test: Option<Option<AbTestConfig>>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub expiration_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub max_clicks: Option<Option<i64>>,

    #[validate(length(max = 128))]
    pub password: Option<String>,
}

impl From<UpdateLinkRequest> for UpdateLink {
    fn from(req: UpdateLinkRequest) -> Self {
        UpdateLink {
            original_url: req.original_url,
            smart_redirects: req.smart_redirects,
            geo_redirects: req.geo_redirects,
            ab_test: req.ab_test,
            start_date: req.start_date,
            expiration_date: req.expiration_date,
            max_clicks: req.max_clicks,
            password: req.password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_null_and_value_are_distinct() {
        let req: UpdateLinkRequest = serde_json::from_str(
            r#"{"expiration_date": null, "max_clicks": 10}"#,
        )
        .unwrap();

        assert_eq!(req.expiration_date, Some(None));
        assert_eq!(req.max_clicks, Some(Some(10)));
        assert!(req.start_date.is_none());
        assert!(req.geo_redirects.is_none());
    }

    #[test]
    fn test_empty_password_is_kept_as_removal() {
        let req: UpdateLinkRequest = serde_json::from_str(r#"{"password": ""}"#).unwrap();
        let update: UpdateLink = req.into();
        assert_eq!(update.password.as_deref(), Some(""));
    }
}
