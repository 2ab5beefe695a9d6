//! Database operations through the PostgREST API

mod filter;
mod query;
mod types;

use reqwest::Client;
use serde::Serialize;

use crate::auth::SharedSession;

pub use filter::*;
pub use query::*;
pub use types::*;

/// Client for database operations on one table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    target: Target,
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    pub fn new(url: &str, key: &str, table: &str, schema: &str, client: Client) -> Self {
        Self {
            target: Target {
                url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
                key: key.to_string(),
                token: None,
                session: None,
                schema: schema.to_string(),
                client,
            },
        }
    }

    /// Run requests with a fixed access token instead of the anonymous role
    pub fn with_auth(mut self, access_token: &str) -> Self {
        self.target.token = Some(access_token.to_string());
        self
    }

    /// Run each request as whoever is signed in at the time it is sent
    pub fn with_session(mut self, session: SharedSession) -> Self {
        self.target.session = Some(session);
        self
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.target.clone(), columns)
    }

    /// Insert data into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.target.clone(), values)
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.target.clone(), values)
    }
}
