//! DTOs for guest links and claiming.
//!
//! Guest creation accepts the same body as `POST /api/links`; options a
//! guest may not use are rejected by the service.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::link::LinkResponse;

/// Response for `POST /api/guest/links`.
///
/// `claim_token` is shown exactly once. Only its hash is stored.
#[derive(Debug, Serialize)]
pub struct GuestLinkResponse {
    #[serde(flatten)]
    pub link: LinkResponse,
    pub claim_token: String,
}

/// Request body for `POST /api/links/claim`.
#[derive(Debug, Deserialize, Validate)]
pub struct ClaimLinkRequest {
    #[validate(length(min = 1, max = 128))]
    pub claim_token: String,
}
