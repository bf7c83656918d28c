use crate::error::{AppError, AppResult};
use crate::models::{Purchase, PurchasesResponse};
use crate::services::api::{read_json, ApiClient};

/// Purchase history of the signed-in customer.
#[derive(Debug, Clone)]
pub struct PurchaseHistoryClient {
    api: ApiClient,
}

impl PurchaseHistoryClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET orders/purchase-history` with the caller's bearer token.
    ///
    /// A missing token is reported as `Unauthorized` without a request.
    pub async fn fetch(&self, token: Option<&str>) -> AppResult<Vec<Purchase>> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let url = self.api.endpoint(&["orders", "purchase-history"])?;
        let response = self
            .api
            .send(self.api.http().get(url).bearer_auth(token))
            .await?;
        let body: PurchasesResponse = read_json(response).await?;

        if !body.success {
            return Err(AppError::Api {
                status: reqwest::StatusCode::OK,
                message: body.error.into_message(),
            });
        }

        tracing::debug!("Loaded {} purchases", body.purchases.len());
        Ok(body.purchases)
    }
}
