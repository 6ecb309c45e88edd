// GitHub API module.
// Provides the client and types used to read user data from the GitHub REST API.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::GitHubClient;
pub use types::{Repo, User};
