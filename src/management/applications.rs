use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, ManagementClient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationList {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub access_url: Option<String>,
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl NewApplication {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            template_id: None,
        }
    }
}

impl ManagementClient {
    pub async fn list_applications(&self) -> Result<ApplicationList, ApiError> {
        let url = self.uri(&["applications"])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    /// Returns the id assigned by the server, when it reports one.
    pub async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<Option<String>, ApiError> {
        let url = self.uri(&["applications"])?;
        let id = self
            .send_create(self.request(Method::POST, url).json(application))
            .await?;
        info!(tenant = %self.tenant(), name = %application.name, ?id, "Application created");
        Ok(id)
    }

    pub async fn delete_application(&self, id: &str) -> Result<(), ApiError> {
        let url = self.uri(&["applications", id])?;
        self.send(self.request(Method::DELETE, url)).await?;
        info!(tenant = %self.tenant(), %id, "Application deleted");
        Ok(())
    }
}
