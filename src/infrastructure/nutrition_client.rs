use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const INSTANT_SEARCH_ENDPOINT: &str = "https://trackapi.nutritionix.com/v2/search/instant";

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct NutrientRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NutrientRange {
    pub fn around(center: f64, tolerance: f64) -> Self {
        Self {
            min: Some(center - tolerance),
            max: Some(center + tolerance),
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct NutrientFilters {
    #[serde(rename = "nf_calories")]
    pub calories: NutrientRange,
    #[serde(rename = "nf_protein")]
    pub protein_g: NutrientRange,
    #[serde(rename = "nf_total_carbohydrate")]
    pub carbs_g: NutrientRange,
    #[serde(rename = "nf_total_fat")]
    pub fat_g: NutrientRange,
    #[serde(rename = "nf_iron", skip_serializing_if = "Option::is_none")]
    pub iron: Option<NutrientRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DishSearchRequest {
    pub query: String,
    pub filters: NutrientFilters,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Dish {
    pub food_name: String,
    #[serde(rename = "nf_calories")]
    pub calories: f64,
    #[serde(rename = "nf_protein")]
    pub protein_g: f64,
    #[serde(rename = "nf_total_carbohydrate")]
    pub carbs_g: f64,
    #[serde(rename = "nf_total_fat")]
    pub fat_g: f64,
}

#[async_trait]
pub trait NutritionClient: Send + Sync {
    async fn search_dishes(&self, request: &DishSearchRequest) -> Result<Vec<Dish>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestNutritionClient {
    client: Client,
    app_id: String,
    app_key: String,
    endpoint: Url,
}

impl ReqwestNutritionClient {
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Result<Self, InfraError> {
        let app_id = app_id.into();
        let app_key = app_key.into();
        Self::ensure_non_empty(&app_id, "nutrition app id")?;
        Self::ensure_non_empty(&app_key, "nutrition app key")?;
        let endpoint = Url::parse(INSTANT_SEARCH_ENDPOINT)
            .map_err(|error| InfraError::Backend(format!("invalid nutrition endpoint: {error}")))?;

        Ok(Self {
            client: Client::new(),
            app_id,
            app_key,
            endpoint,
        })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Backend(format!("{field} must not be empty")));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct InstantSearchResponse {
    branded: Option<Vec<Dish>>,
}

#[async_trait]
impl NutritionClient for ReqwestNutritionClient {
    async fn search_dishes(&self, request: &DishSearchRequest) -> Result<Vec<Dish>, InfraError> {
        Self::ensure_non_empty(&request.query, "search query")?;

        let filters = serde_json::to_string(&request.filters)?;
        let response = self
            .client
            .get(self.endpoint.clone())
            .header("x-app-id", &self.app_id)
            .header("x-app-key", &self.app_key)
            .query(&[
                ("query", request.query.as_str()),
                ("detailed", "true"),
                ("common", "false"),
                ("nutrient_filters", filters.as_str()),
            ])
            .send()
            .await
            .map_err(|error| {
                InfraError::Backend(format!("network error while searching dishes: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Backend(format!("failed reading dish search response: {error}"))
        })?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                format!("nutrition api error: http {}", status.as_u16())
            } else {
                format!("nutrition api error: http {}; body={body}", status.as_u16())
            };
            return Err(InfraError::Backend(message));
        }

        let parsed: InstantSearchResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::Backend(format!("invalid dish search payload: {error}; body={body}"))
        })?;
        Ok(parsed.branded.unwrap_or_default())
    }
}
