use serde::Serialize;

use super::attraction::Attraction;
use super::user::{hex_ids, User};

/// Result of adding an attraction to one of a user's curation lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    Added,
    /// Already present (or, for want-to-visit, already visited); nothing changed
    AlreadyMarked,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttractionCounters {
    pub visited: i64,
    pub want_to_visit_count: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurationResponse {
    pub success: bool,
    pub status: MarkOutcome,
    pub been_there: Vec<String>,
    pub want_to_visit: Vec<String>,
    pub list: Vec<String>,
    pub attraction: AttractionCounters,
}

impl CurationResponse {
    pub fn new(status: MarkOutcome, user: &User, attraction: &Attraction) -> Self {
        CurationResponse {
            success: true,
            status,
            been_there: hex_ids(&user.been_there),
            want_to_visit: hex_ids(&user.want_to_visit),
            list: hex_ids(&user.list),
            attraction: AttractionCounters {
                visited: attraction.visited,
                want_to_visit_count: attraction.want_to_visit_count,
            },
        }
    }
}
