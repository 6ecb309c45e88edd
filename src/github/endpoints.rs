// GitHub API endpoint functions.
// Provides typed methods for fetching user data from the GitHub REST API.

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{Repo, User};

impl GitHubClient {
    /// Get the public profile of `username`.
    pub async fn user_info(&self, username: &str) -> Result<User> {
        let response = self.get(&format!("/users/{}", username)).await?;
        let user: User = self.check_response(response, username)?.json()?;
        Ok(user)
    }

    /// Get the public repositories of `username`.
    pub async fn public_repos_for_user(&self, username: &str) -> Result<Vec<Repo>> {
        let response = self.get(&format!("/users/{}/repos", username)).await?;
        let repos: Vec<Repo> = self.check_response(response, username)?.json()?;
        Ok(repos)
    }
}
