//! Microsoft Graph implementation of [`DirectoryPort`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    config::GraphConfig,
    directory::{
        auth::{ClientCredentials, TokenCache, resolve_credential},
        error::{DirectoryError, invalid_request, map_http_error, protocol, transport},
        ports::DirectoryPort,
        types::{
            CloudDesktop, CloudDesktopQuery, DirectoryGroup, DirectoryUser, GroupQuery,
            PolicyAssignment, ProvisioningPolicy, SubscribedSku, UserQuery,
        },
    },
};

const USER_SELECT: &str =
    "id,displayName,userPrincipalName,mail,jobTitle,department,accountEnabled,assignedLicenses";
const GROUP_SELECT: &str = "id,displayName,description,groupTypes,mailEnabled,securityEnabled";
const POLICIES_PATH: [&str; 3] = ["deviceManagement", "virtualEndpoint", "provisioningPolicies"];
const CLOUD_PCS_PATH: [&str; 3] = ["deviceManagement", "virtualEndpoint", "cloudPCs"];

#[derive(Debug, Deserialize)]
struct ODataCollection<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Whether a request needs `ConsistencyLevel: eventual` (required for `$search`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consistency {
    Default,
    Eventual,
}

pub struct GraphDirectory {
    http: reqwest::Client,
    tokens: TokenCache,
    base_url: Url,
}

impl GraphDirectory {
    pub fn from_config(config: &GraphConfig) -> Result<Self, DirectoryError> {
        let credentials = ClientCredentials {
            tenant_id: resolve_credential("tenant_id", &config.tenant_id)?,
            client_id: resolve_credential("client_id", &config.client_id)?,
            client_secret: resolve_credential("client_secret", &config.client_secret)?,
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|err| transport(format!("failed to build graph http client: {err}")))?;

        let graph_endpoint = config.endpoint.trim_end_matches('/').to_string();
        let base_url = Url::parse(&format!("{}/{}", graph_endpoint, config.api_version))
            .map_err(|err| invalid_request(format!("invalid graph endpoint: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_request("graph endpoint must be a hierarchical url"));
        }

        let tokens = TokenCache::new(
            http.clone(),
            &config.login_endpoint,
            &graph_endpoint,
            credentials,
        );

        Ok(Self {
            http,
            tokens,
            base_url,
        })
    }

    fn url(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| invalid_request("graph endpoint must be a hierarchical url"))?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        consistency: Consistency,
    ) -> Result<reqwest::Response, DirectoryError> {
        let token = self.tokens.access_token().await?;
        let path = url.path().to_string();

        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if consistency == Consistency::Eventual {
            request = request.header("ConsistencyLevel", "eventual");
        }
        request = match body {
            Some(body) => request.json(&body),
            None if method == Method::POST => request.header(reqwest::header::CONTENT_LENGTH, "0"),
            None => request,
        };

        tracing::debug!(target: "directory", method = %method, path = %path, "graph_request");
        let response = request.send().await.map_err(|err| {
            transport(format!("graph request {method} {path} failed: {err}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ODataError>(&body) {
            Ok(parsed) if !parsed.error.message.is_empty() => {
                format!("{} ({})", parsed.error.message, parsed.error.code)
            }
            _ => body,
        };
        Err(map_http_error(status.as_u16(), &message))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        consistency: Consistency,
    ) -> Result<T, DirectoryError> {
        let response = self.send(Method::GET, url, None, consistency).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| protocol(format!("failed to decode graph response: {err}")))
    }

    /// Follows `@odata.nextLink` until exhausted or `limit` items are collected.
    async fn get_collection<T: DeserializeOwned>(
        &self,
        url: Url,
        limit: Option<usize>,
        consistency: Consistency,
    ) -> Result<Vec<T>, DirectoryError> {
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            let page: ODataCollection<T> = self.get_json(url, consistency).await?;
            items.extend(page.value);
            if let Some(limit) = limit
                && items.len() >= limit
            {
                items.truncate(limit);
                break;
            }
            next = match page.next_link {
                Some(link) => Some(
                    Url::parse(&link)
                        .map_err(|err| protocol(format!("invalid @odata.nextLink: {err}")))?,
                ),
                None => None,
            };
        }

        Ok(items)
    }

    async fn post(&self, url: Url, body: Option<Value>) -> Result<(), DirectoryError> {
        self.send(Method::POST, url, body, Consistency::Default)
            .await
            .map(|_| ())
    }

    fn directory_object_ref(&self, object_id: &str) -> String {
        format!(
            "{}/directoryObjects/{}",
            self.base_url.as_str().trim_end_matches('/'),
            object_id
        )
    }
}

fn search_clause(properties: &[&str], term: &str) -> String {
    let term = term.replace('"', "");
    properties
        .iter()
        .map(|property| format!("\"{property}:{term}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn quote_odata(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl DirectoryPort for GraphDirectory {
    async fn get_user(&self, user_id: &str) -> Result<DirectoryUser, DirectoryError> {
        let url = self.url(&["users", user_id], &[("$select", USER_SELECT.to_string())])?;
        self.get_json(url, Consistency::Default).await
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let mut params = vec![
            ("$top", query.top.to_string()),
            ("$select", USER_SELECT.to_string()),
        ];
        let mut consistency = Consistency::Default;
        if let Some(search) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
            params.push((
                "$search",
                search_clause(&["displayName", "userPrincipalName"], search.trim()),
            ));
            params.push(("$count", "true".to_string()));
            consistency = Consistency::Eventual;
        }

        let url = self.url(&["users"], &params)?;
        self.get_collection(url, Some(query.top as usize), consistency)
            .await
    }

    async fn list_groups(
        &self,
        query: &GroupQuery,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let mut params = vec![
            ("$top", query.top.to_string()),
            ("$select", GROUP_SELECT.to_string()),
        ];
        let search = query.search.as_deref().filter(|term| !term.trim().is_empty());
        let clause = match search {
            Some(term) => Some(search_clause(&["displayName"], term.trim())),
            None if !query.display_name_contains.is_empty() => Some(
                query
                    .display_name_contains
                    .iter()
                    .map(|marker| search_clause(&["displayName"], marker))
                    .collect::<Vec<_>>()
                    .join(" OR "),
            ),
            None => None,
        };

        let mut consistency = Consistency::Default;
        if let Some(clause) = clause {
            params.push(("$search", clause));
            params.push(("$count", "true".to_string()));
            consistency = Consistency::Eventual;
        }

        let url = self.url(&["groups"], &params)?;
        self.get_collection(url, Some(query.top as usize), consistency)
            .await
    }

    async fn get_group(&self, group_id: &str) -> Result<DirectoryGroup, DirectoryError> {
        let url = self.url(&["groups", group_id], &[("$select", GROUP_SELECT.to_string())])?;
        self.get_json(url, Consistency::Default).await
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        let url = self.url(&["groups", group_id, "members", "$ref"], &[])?;
        let body = json!({ "@odata.id": self.directory_object_ref(user_id) });
        self.post(url, Some(body)).await
    }

    async fn list_subscribed_skus(&self) -> Result<Vec<SubscribedSku>, DirectoryError> {
        let url = self.url(&["subscribedSkus"], &[])?;
        self.get_collection(url, None, Consistency::Default).await
    }

    async fn assign_license(&self, user_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        let url = self.url(&["users", user_id, "assignLicense"], &[])?;
        let body = json!({
            "addLicenses": [{ "skuId": sku_id, "disabledPlans": [] }],
            "removeLicenses": [],
        });
        self.post(url, Some(body)).await
    }

    async fn remove_license(&self, user_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        let url = self.url(&["users", user_id, "assignLicense"], &[])?;
        let body = json!({
            "addLicenses": [],
            "removeLicenses": [sku_id],
        });
        self.post(url, Some(body)).await
    }

    async fn list_provisioning_policies(&self) -> Result<Vec<ProvisioningPolicy>, DirectoryError> {
        let url = self.url(&POLICIES_PATH, &[])?;
        self.get_collection(url, None, Consistency::Default).await
    }

    async fn get_provisioning_policy(
        &self,
        policy_id: &str,
        expand_assignments: bool,
    ) -> Result<ProvisioningPolicy, DirectoryError> {
        let mut segments = POLICIES_PATH.to_vec();
        segments.push(policy_id);
        let params = if expand_assignments {
            vec![("$expand", "assignments".to_string())]
        } else {
            Vec::new()
        };
        let url = self.url(&segments, &params)?;
        self.get_json(url, Consistency::Default).await
    }

    async fn list_policy_assignments(
        &self,
        policy_id: &str,
    ) -> Result<Vec<PolicyAssignment>, DirectoryError> {
        let mut segments = POLICIES_PATH.to_vec();
        segments.extend([policy_id, "assignments"]);
        let url = self.url(&segments, &[])?;
        self.get_collection(url, None, Consistency::Default).await
    }

    async fn list_cloud_desktops(
        &self,
        query: &CloudDesktopQuery,
    ) -> Result<Vec<CloudDesktop>, DirectoryError> {
        let mut clauses = Vec::new();
        if let Some(filter) = query.filter.as_deref().filter(|value| !value.trim().is_empty()) {
            clauses.push(format!("({filter})"));
        }
        if let Some(upn) = query.user_principal_name.as_deref() {
            clauses.push(format!("userPrincipalName eq '{}'", quote_odata(upn)));
        }

        let mut params = vec![("$top", query.top.to_string())];
        if !clauses.is_empty() {
            params.push(("$filter", clauses.join(" and ")));
        }

        let url = self.url(&CLOUD_PCS_PATH, &params)?;
        self.get_collection(url, Some(query.top as usize), Consistency::Default)
            .await
    }

    async fn get_cloud_desktop(
        &self,
        cloud_desktop_id: &str,
    ) -> Result<CloudDesktop, DirectoryError> {
        let mut segments = CLOUD_PCS_PATH.to_vec();
        segments.push(cloud_desktop_id);
        let url = self.url(&segments, &[])?;
        self.get_json(url, Consistency::Default).await
    }

    async fn reboot_cloud_desktop(&self, cloud_desktop_id: &str) -> Result<(), DirectoryError> {
        let mut segments = CLOUD_PCS_PATH.to_vec();
        segments.extend([cloud_desktop_id, "reboot"]);
        let url = self.url(&segments, &[])?;
        self.post(url, None).await
    }

    async fn end_grace_period(&self, cloud_desktop_id: &str) -> Result<(), DirectoryError> {
        let mut segments = CLOUD_PCS_PATH.to_vec();
        segments.extend([cloud_desktop_id, "endGracePeriod"]);
        let url = self.url(&segments, &[])?;
        self.post(url, None).await
    }
}
