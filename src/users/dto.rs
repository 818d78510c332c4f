use serde::Deserialize;

/// Request body for user creation (signup).
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(alias = "name")]
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for user update; password is optional.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(alias = "name")]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}
