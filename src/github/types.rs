// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses.

use serde::{Deserialize, Serialize};

/// Public profile of a GitHub user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: Option<String>,
    pub location: Option<String>,
    pub public_repos: u64,
}

/// A repository as listed for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(rename = "full_name")]
    pub name: String,
    pub url: String,
}
