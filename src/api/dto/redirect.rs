//! DTOs for the public redirect endpoint.

use serde::Deserialize;

use crate::domain::entities::UtmParams;

/// Header carrying a link password on `GET /r/{code}`.
pub const LINK_PASSWORD_HEADER: &str = "x-link-password";

/// Query string of `/r/{code}`. Only UTM parameters are read; anything else
/// is ignored.
#[derive(Debug, Default)]
pub struct RedirectQuery {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

impl RedirectQuery {
    /// Collects UTM values from raw query pairs. A repeated key keeps its
    /// first value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "utm_source" => &mut query.utm_source,
                "utm_medium" => &mut query.utm_medium,
                "utm_campaign" => &mut query.utm_campaign,
                "utm_term" => &mut query.utm_term,
                "utm_content" => &mut query.utm_content,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        query
    }
}

impl From<RedirectQuery> for UtmParams {
    fn from(q: RedirectQuery) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().chars().take(255).collect::<String>())
                .filter(|s| !s.is_empty())
        };

        UtmParams {
            source: clean(q.utm_source),
            medium: clean(q.utm_medium),
            campaign: clean(q.utm_campaign),
            term: clean(q.utm_term),
            content: clean(q.utm_content),
        }
    }
}

/// Body of `POST /r/{code}`.
#[derive(Debug, Deserialize)]
pub struct PasswordSubmission {
    pub password: String,
}
