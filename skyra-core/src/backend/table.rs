use reqwest::RequestBuilder;
use serde::{Serialize, de::DeserializeOwned};

use super::{Backend, BackendError, check};

/// Row access to one PostgREST table.
#[derive(Debug, Clone)]
pub struct TableClient {
    backend: Backend,
    table: String,
}

/// `column = value` pairs joined with AND.
pub type Filters<'a> = &'a [(&'a str, &'a str)];

fn eq_params(filters: Filters<'_>) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|(column, value)| (column.to_string(), format!("eq.{value}")))
        .collect()
}

impl TableClient {
    pub fn new(backend: Backend, table: &str) -> Self {
        Self {
            backend,
            table: table.to_string(),
        }
    }

    fn url(&self) -> String {
        self.backend.endpoint(&format!("/rest/v1/{}", self.table))
    }

    fn request(&self, req: RequestBuilder, access_token: &str) -> RequestBuilder {
        self.backend.authorize(req, Some(access_token))
    }

    /// `order` uses PostgREST syntax, e.g. `created_at.desc`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        access_token: &str,
        columns: &str,
        filters: Filters<'_>,
        order: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let mut params = eq_params(filters);
        params.push(("select".into(), columns.into()));
        if let Some(order) = order {
            params.push(("order".into(), order.into()));
        }

        let req = self.backend.http.get(self.url()).query(&params);
        let response = check(self.request(req, access_token).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Exactly one row, or [`BackendError::NoRows`].
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        access_token: &str,
        columns: &str,
        filters: Filters<'_>,
    ) -> Result<T, BackendError> {
        let mut params = eq_params(filters);
        params.push(("select".into(), columns.into()));

        let req = self
            .backend
            .http
            .get(self.url())
            .query(&params)
            .header("Accept", "application/vnd.pgrst.object+json");
        let response = check(self.request(req, access_token).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn insert<B: Serialize + ?Sized>(
        &self,
        access_token: &str,
        rows: &B,
    ) -> Result<(), BackendError> {
        let req = self
            .backend
            .http
            .post(self.url())
            .header("Prefer", "return=minimal")
            .json(rows);
        check(self.request(req, access_token).send().await?).await?;
        Ok(())
    }

    /// Insert, or overwrite the row with the same primary key.
    pub async fn upsert<B: Serialize + ?Sized>(
        &self,
        access_token: &str,
        rows: &B,
    ) -> Result<(), BackendError> {
        let req = self
            .backend
            .http
            .post(self.url())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        check(self.request(req, access_token).send().await?).await?;
        Ok(())
    }

    pub async fn delete(&self, access_token: &str, filters: Filters<'_>) -> Result<(), BackendError> {
        let req = self
            .backend
            .http
            .delete(self.url())
            .query(&eq_params(filters));
        check(self.request(req, access_token).send().await?).await?;
        Ok(())
    }
}
