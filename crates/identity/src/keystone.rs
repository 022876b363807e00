use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use canopy_core::ProjectId;

use crate::error::IdentityError;
use crate::service::{IdentityService, ProjectRecord};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the caller's token.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Deserialize)]
struct ProjectEnvelope {
    project: ProjectBody,
}

#[derive(Debug, Deserialize)]
struct ProjectBody {
    id: ProjectId,
    #[serde(default)]
    parent_id: Option<ProjectId>,
    #[serde(default)]
    subtree: Option<Vec<Value>>,
}

/// [`IdentityService`] backed by a Keystone v3 endpoint.
#[derive(Debug, Clone)]
pub struct KeystoneIdentityService {
    client: Client,
    base_url: String,
    endpoint: Url,
}

/// Builder for configuring a [`KeystoneIdentityService`].
#[derive(Debug)]
pub struct KeystoneIdentityServiceBuilder {
    base_url: String,
    timeout: Duration,
    client: Option<Client>,
}

impl KeystoneIdentityServiceBuilder {
    /// Create a new builder with the given base URL (without the `/v3`
    /// suffix).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<KeystoneIdentityService, IdentityError> {
        let endpoint = Url::parse(&self.base_url)
            .map_err(|e| IdentityError::Configuration(format!("{}: {e}", self.base_url)))?;
        if endpoint.cannot_be_a_base() {
            return Err(IdentityError::Configuration(format!(
                "{} cannot be used as a base URL",
                self.base_url
            )));
        }
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| IdentityError::Configuration(e.to_string()))?,
        };

        Ok(KeystoneIdentityService {
            client,
            base_url: self.base_url,
            endpoint,
        })
    }
}

impl KeystoneIdentityService {
    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> KeystoneIdentityServiceBuilder {
        KeystoneIdentityServiceBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/v3/projects/{id}` with the id percent-encoded as one segment.
    fn project_url(&self, project_id: &ProjectId) -> Result<Url, IdentityError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                IdentityError::Configuration(format!("{} is not a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v3", "projects", project_id.as_str()]);
        Ok(url)
    }

    async fn fetch(
        &self,
        token: &str,
        project_id: &ProjectId,
        query: &[(&str, &str)],
    ) -> Result<ProjectBody, IdentityError> {
        let response = self
            .client
            .get(self.project_url(project_id)?)
            .header(AUTH_TOKEN_HEADER, token)
            .query(query)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let envelope = response
                    .json::<ProjectEnvelope>()
                    .await
                    .map_err(|e| IdentityError::Malformed(e.to_string()))?;
                Ok(envelope.project)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Denied(
                format!("{} for project {project_id}", response.status()),
            )),
            StatusCode::NOT_FOUND => Err(IdentityError::ProjectNotFound(project_id.to_string())),
            status => Err(IdentityError::Unavailable(format!(
                "unexpected status {status} for project {project_id}"
            ))),
        }
    }
}

#[async_trait]
impl IdentityService for KeystoneIdentityService {
    async fn get_project(
        &self,
        token: &str,
        project_id: &ProjectId,
    ) -> Result<ProjectRecord, IdentityError> {
        let body = self.fetch(token, project_id, &[]).await?;
        debug!(project = %body.id, parent = ?body.parent_id, "fetched project");
        Ok(ProjectRecord {
            id: body.id,
            parent_id: body.parent_id,
        })
    }

    async fn get_subtree(
        &self,
        token: &str,
        project_id: &ProjectId,
    ) -> Result<Vec<Value>, IdentityError> {
        let body = self
            .fetch(token, project_id, &[("subtree_as_list", "true")])
            .await?;
        Ok(body.subtree.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn service(server: &MockServer) -> KeystoneIdentityService {
        KeystoneIdentityService::builder(server.base_url())
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let svc = KeystoneIdentityService::builder("http://keystone:5000/")
            .build()
            .unwrap();
        assert_eq!(svc.base_url(), "http://keystone:5000");
        assert_eq!(
            svc.project_url(&"p1".into()).unwrap().as_str(),
            "http://keystone:5000/v3/projects/p1"
        );
    }

    #[test]
    fn project_id_is_encoded_as_one_segment() {
        let svc = KeystoneIdentityService::builder("http://keystone:5000/identity")
            .build()
            .unwrap();
        let url = svc.project_url(&"a/b?c".into()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://keystone:5000/identity/v3/projects/a%2Fb%3Fc"
        );
        assert!(url.query().is_none());
    }

    #[test]
    fn unparsable_base_url_is_a_configuration_error() {
        let err = KeystoneIdentityService::builder("not a url").build().unwrap_err();
        assert!(matches!(err, IdentityError::Configuration(_)));
    }

    #[tokio::test]
    async fn get_project_forwards_token_and_reads_parent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v3/projects/child")
                .header("X-Auth-Token", "tok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"project": {"id": "child", "parent_id": "root", "name": "c"}}));
        });

        let record = service(&server)
            .get_project("tok", &"child".into())
            .await
            .unwrap();
        assert_eq!(record, ProjectRecord::child("child", "root"));
        mock.assert();
    }

    #[tokio::test]
    async fn null_parent_means_root() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v3/projects/root");
            then.status(200)
                .json_body(json!({"project": {"id": "root", "parent_id": null}}));
        });

        let record = service(&server)
            .get_project("tok", &"root".into())
            .await
            .unwrap();
        assert!(record.parent_id.is_none());
    }

    #[tokio::test]
    async fn subtree_is_requested_as_list() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v3/projects/root")
                .query_param("subtree_as_list", "true");
            then.status(200).json_body(json!({
                "project": {
                    "id": "root",
                    "subtree": [
                        {"project": {"id": "a", "parent_id": "root"}},
                        {"bogus": true}
                    ]
                }
            }));
        });

        let subtree = service(&server)
            .get_subtree("tok", &"root".into())
            .await
            .unwrap();
        assert_eq!(subtree.len(), 2, "entries are passed through untouched");
        mock.assert();
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v3/projects/denied");
            then.status(403);
        });
        server.mock(|when, then| {
            when.method(GET).path("/v3/projects/gone");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/v3/projects/broken");
            then.status(503);
        });
        server.mock(|when, then| {
            when.method(GET).path("/v3/projects/garbled");
            then.status(200).body("not json");
        });

        let svc = service(&server);
        let err = svc.get_project("t", &"denied".into()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Denied(_)));
        let err = svc.get_project("t", &"gone".into()).await.unwrap_err();
        assert!(matches!(err, IdentityError::ProjectNotFound(_)));
        let err = svc.get_project("t", &"broken".into()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable(_)));
        let err = svc.get_project("t", &"garbled".into()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Malformed(_)));
    }
}
