use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, ManagementClient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub api_resources: Vec<ApiResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub id: String,
    pub name: String,
    pub identifier: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub requires_authorization: bool,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiResource {
    pub name: String,
    pub identifier: String,
    pub requires_authorization: bool,
}

impl ManagementClient {
    /// `kind` narrows the listing with a `type eq` filter (e.g. `BUSINESS`).
    pub async fn list_api_resources(
        &self,
        kind: Option<&str>,
    ) -> Result<ApiResourceList, ApiError> {
        let url = self.uri(&["api-resources"])?;
        let mut query = vec![("attributes", "properties".to_string())];
        if let Some(kind) = kind.map(str::trim).filter(|k| !k.is_empty()) {
            query.push(("filter", format!("type eq {kind}")));
        }
        self.send_json(self.request(Method::GET, url).query(&query)).await
    }

    pub async fn get_api_resource(&self, id: &str) -> Result<ApiResource, ApiError> {
        let url = self.uri(&["api-resources", id])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn create_api_resource(
        &self,
        resource: &NewApiResource,
    ) -> Result<Option<String>, ApiError> {
        let url = self.uri(&["api-resources"])?;
        let id = self
            .send_create(self.request(Method::POST, url).json(resource))
            .await?;
        info!(
            tenant = %self.tenant(),
            identifier = %resource.identifier,
            ?id,
            "API resource created"
        );
        Ok(id)
    }

    pub async fn delete_api_resource(&self, id: &str) -> Result<(), ApiError> {
        let url = self.uri(&["api-resources", id])?;
        self.send(self.request(Method::DELETE, url)).await?;
        info!(tenant = %self.tenant(), %id, "API resource deleted");
        Ok(())
    }
}
