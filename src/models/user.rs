use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// User document in the "users" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// bcrypt hash, absent for accounts created through OAuth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default)]
    pub added_attractions: Vec<ObjectId>,
    #[serde(default)]
    pub been_there: Vec<ObjectId>,
    #[serde(default)]
    pub want_to_visit: Vec<ObjectId>,
    /// Saved / bookmarked attractions
    #[serde(default)]
    pub list: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
}

impl User {
    pub fn new(username: String, email: Option<String>) -> Self {
        Self {
            id: None,
            username,
            email,
            password: None,
            google_id: None,
            added_attractions: Vec::new(),
            been_there: Vec::new(),
            want_to_visit: Vec::new(),
            list: Vec::new(),
            created_at: Some(BsonDateTime::now()),
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Projection of a user used to resolve review authors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthorView {
    pub id: String,
    pub username: String,
}

impl From<UserSummary> for AuthorView {
    fn from(summary: UserSummary) -> Self {
        AuthorView {
            id: summary.id.to_hex(),
            username: summary.username,
        }
    }
}

/// Public view of a user, never carries credentials
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub added_attractions: Vec<String>,
    pub been_there: Vec<String>,
    pub want_to_visit: Vec<String>,
    pub list: Vec<String>,
}

pub fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            added_attractions: hex_ids(&user.added_attractions),
            been_there: hex_ids(&user.been_there),
            want_to_visit: hex_ids(&user.want_to_visit),
            list: hex_ids(&user.list),
        }
    }
}
