//! Query builders for PostgrestClient

use log::debug;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::{current_access_token, SharedSession};
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::*;
use crate::postgrest::types::*;

/// Connection details shared by every builder
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) token: Option<String>,
    pub(crate) session: Option<SharedSession>,
    pub(crate) schema: String,
    pub(crate) client: Client,
}

impl Target {
    /// Bearer token for the next request: a fixed token, else the live
    /// session's, else the anonymous key
    fn bearer(&self) -> String {
        self.token
            .clone()
            .or_else(|| self.session.as_ref().and_then(current_access_token))
            .unwrap_or_else(|| self.key.clone())
    }

    fn prepare<'a>(&'a self, fetch: FetchBuilder<'a>, reading: bool) -> FetchBuilder<'a> {
        let profile_header = if reading { "Accept-Profile" } else { "Content-Profile" };
        fetch
            .api_key(&self.key)
            .bearer_auth(&self.bearer())
            .header(profile_header, &self.schema)
    }
}

/// Ordered query parameters; a column may carry several filters
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Replace every parameter named `key`
    pub fn set_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.add_param(key, value);
    }

    /// Add a filter on a column
    pub fn filter(&mut self, column: &str, operator: FilterOperator, value: &str) {
        self.add_param(column, &operator.expression(value));
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

macro_rules! filter_methods {
    () => {
        /// Filter rows where column equals a value
        pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
            self.query.filter(column, FilterOperator::Eq, &value.to_string());
            self
        }

        /// Filter rows where column does not equal a value
        pub fn neq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
            self.query.filter(column, FilterOperator::Neq, &value.to_string());
            self
        }

        /// Filter rows where column is null
        pub fn is_null(&mut self, column: &str) -> &mut Self {
            self.query.filter(column, FilterOperator::Is, "null");
            self
        }

        /// Filter rows where column is not null
        pub fn not_null(&mut self, column: &str) -> &mut Self {
            self.query
                .add_param(column, &not(&FilterOperator::Is.expression("null")));
            self
        }
    };
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    target: Target,
    query: QueryBuilder,
    count: Option<CountOption>,
}

impl SelectBuilder {
    pub(crate) fn new(target: Target, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);

        Self {
            target,
            query,
            count: None,
        }
    }

    filter_methods!();

    /// Filter rows where column is greater than a value
    pub fn gt<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.filter(column, FilterOperator::Gt, &value.to_string());
        self
    }

    /// Filter rows where column is greater than or equal to a value
    pub fn gte<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.filter(column, FilterOperator::Gte, &value.to_string());
        self
    }

    /// Filter rows where column is less than a value
    pub fn lt<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.filter(column, FilterOperator::Lt, &value.to_string());
        self
    }

    /// Filter rows where column is less than or equal to a value
    pub fn lte<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.filter(column, FilterOperator::Lte, &value.to_string());
        self
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<V: ToString>(&mut self, column: &str, values: &[V]) -> &mut Self {
        let values_str: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.query
            .filter(column, FilterOperator::In, &format!("({})", values_str.join(",")));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(&mut self, count: u32) -> &mut Self {
        self.query.set_param("limit", &count.to_string());
        self
    }

    /// Order the results by a column
    pub fn order(&mut self, column: &str, ascending: bool) -> &mut Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query.set_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Ask the server to count matching rows
    pub fn count(&mut self, option: CountOption) -> &mut Self {
        self.count = Some(option);
        self
    }

    fn fetch(&self) -> FetchBuilder<'_> {
        let mut fetch = self
            .target
            .prepare(Fetch::get(&self.target.client, &self.target.url), true)
            .query(self.query.get_params().iter().cloned());
        if let Some(count) = self.count {
            fetch = fetch.header("Prefer", &format!("count={}", count.as_str()));
        }
        fetch
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.fetch().execute::<Vec<T>>().await
    }

    /// Execute the query and return the first row
    pub async fn execute_one<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        self.limit(1);

        let results = self.execute::<T>().await?;
        Ok(results.into_iter().next())
    }

    /// Execute the query and return only the number of matching rows.
    ///
    /// Uses the `Content-Range` total when the server sends one, otherwise the
    /// number of rows in the body.
    pub async fn execute_count(&mut self) -> Result<u64, Error> {
        if self.count.is_none() {
            self.count(CountOption::Exact);
        }

        let response = self.fetch().execute_checked().await?;
        let total = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        match total {
            Some(total) => Ok(total),
            None => {
                debug!("No Content-Range total for {}, counting rows", self.target.url);
                let rows = response.json::<Vec<serde_json::Value>>().await?;
                Ok(rows.len() as u64)
            }
        }
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    target: Target,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self { target, values }
    }

    /// Execute the query and return the inserted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        self.target
            .prepare(Fetch::post(&self.target.client, &self.target.url), false)
            .header("Prefer", ReturnOption::Representation.prefer())
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }

    /// Execute the query without returning the inserted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.target
            .prepare(Fetch::post(&self.target.client, &self.target.url), false)
            .header("Prefer", ReturnOption::Minimal.prefer())
            .json(&self.values)?
            .execute_checked()
            .await?;
        Ok(())
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    filter_methods!();

    fn guard(&self) -> Result<(), Error> {
        // An unfiltered PATCH would rewrite the whole table.
        if self.query.get_params().is_empty() {
            return Err(Error::database("update requires at least one filter"));
        }
        Ok(())
    }

    /// Execute the query and return the updated rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        self.guard()?;
        self.target
            .prepare(Fetch::patch(&self.target.client, &self.target.url), false)
            .header("Prefer", ReturnOption::Representation.prefer())
            .query(self.query.get_params().iter().cloned())
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }

    /// Execute the query without returning the updated data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.guard()?;
        self.target
            .prepare(Fetch::patch(&self.target.client, &self.target.url), false)
            .header("Prefer", ReturnOption::Minimal.prefer())
            .query(self.query.get_params().iter().cloned())
            .json(&self.values)?
            .execute_checked()
            .await?;
        Ok(())
    }
}
