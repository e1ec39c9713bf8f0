// Meta Graph API client
// Resource operations on top of the credential resolver and HTTP transport

pub mod pagination;

use futures::{Stream, TryStreamExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::auth::AuthManager;
use crate::error::{Error, Result};
use crate::http_client::GraphHttpClient;
use crate::models::meta::{
    normalize_account_id, AccountUserPermission, AdAccount, AdSet, AdSetQuery, Campaign,
    CreatedObject, FundingSource, FundingSourceEnvelope, ListOptions, Page, PageDetails,
    SuccessResponse, AD_ACCOUNT_FIELDS, AD_SET_FIELDS, CAMPAIGN_FIELDS, FUNDING_SOURCE_FIELDS,
    PAGE_DETAIL_FIELDS, PAGE_FIELDS,
};

pub use pagination::{paginate, Cursors, Paged, Paging};

/// Page size used when draining a collection
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Resource-oriented Graph API client
#[derive(Clone)]
pub struct MetaApiClient {
    auth: Arc<AuthManager>,
    http: Arc<GraphHttpClient>,
}

impl MetaApiClient {
    pub fn new(auth: Arc<AuthManager>, http: Arc<GraphHttpClient>) -> Self {
        Self { auth, http }
    }

    /// Client with a default transport
    pub fn from_auth(auth: Arc<AuthManager>) -> Result<Self> {
        let http = GraphHttpClient::new(20, 30, 60)?;
        Ok(Self::new(auth, Arc::new(http)))
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Absolute URL for a path under the versioned base
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.auth.get_base_url(), path.trim_start_matches('/'))
    }

    /// Issue one request: token as `access_token` query parameter, JSON body for writes
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let mut builder = self
            .http
            .client()
            .request(method, self.endpoint(path))
            .query(query)
            .query(&[("access_token", self.auth.get_access_token())]);

        if let Some(body) = body {
            builder = builder.json(body);
        }

        let request = builder
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build request: {}", e)))?;

        self.http.execute_json(request).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.send(Method::GET, path, query, None).await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &str,
        options: &ListOptions,
    ) -> Result<Paged<T>> {
        let mut query = vec![("fields", fields.to_string())];
        if let Some(limit) = options.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(after) = &options.after {
            query.push(("after", after.clone()));
        }
        self.get(path, &query).await
    }

    fn list_stream<'a, T>(
        &'a self,
        path: String,
        fields: &'static str,
        limit: u32,
    ) -> impl Stream<Item = Result<T>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        paginate(move |after| {
            let path = path.clone();
            async move {
                let options = ListOptions {
                    limit: Some(limit),
                    after,
                };
                self.list(&path, fields, &options).await
            }
        })
    }

    // ==============================================================================================
    // Ad accounts
    // ==============================================================================================

    /// Every ad account of the token's user, following all pages
    pub async fn get_ad_accounts(&self) -> Result<Vec<AdAccount>> {
        let accounts: Vec<AdAccount> = self.ad_accounts_stream(DEFAULT_PAGE_SIZE).try_collect().await?;
        tracing::debug!(count = accounts.len(), "Fetched ad accounts");
        Ok(accounts)
    }

    pub fn ad_accounts_stream(&self, limit: u32) -> impl Stream<Item = Result<AdAccount>> + '_ {
        self.list_stream("me/adaccounts".to_string(), AD_ACCOUNT_FIELDS, limit)
    }

    pub async fn get_ad_account(&self, account_id: &str) -> Result<AdAccount> {
        let path = normalize_account_id(account_id);
        self.get(&path, &[("fields", AD_ACCOUNT_FIELDS.to_string())])
            .await
    }

    // ==============================================================================================
    // Campaigns
    // ==============================================================================================

    pub async fn get_campaigns(
        &self,
        account_id: &str,
        options: &ListOptions,
    ) -> Result<Paged<Campaign>> {
        let path = format!("{}/campaigns", normalize_account_id(account_id));
        self.list(&path, CAMPAIGN_FIELDS, options).await
    }

    pub fn campaigns_stream(
        &self,
        account_id: &str,
        limit: u32,
    ) -> impl Stream<Item = Result<Campaign>> + '_ {
        let path = format!("{}/campaigns", normalize_account_id(account_id));
        self.list_stream(path, CAMPAIGN_FIELDS, limit)
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<Campaign> {
        self.get(campaign_id, &[("fields", CAMPAIGN_FIELDS.to_string())])
            .await
    }

    /// Create a campaign; `fields` is forwarded as-is
    pub async fn create_campaign(
        &self,
        account_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<CreatedObject> {
        let path = format!("{}/campaigns", normalize_account_id(account_id));
        tracing::info!(account_id = %path, "Creating campaign");
        let created: CreatedObject = self
            .send(Method::POST, &path, &[], Some(&Value::Object(fields.clone())))
            .await?;
        tracing::info!(campaign_id = %created.id, "Campaign created");
        Ok(created)
    }

    // ==============================================================================================
    // Ad sets
    // ==============================================================================================

    pub async fn get_ad_sets(&self, query: &AdSetQuery) -> Result<Paged<AdSet>> {
        let path = format!("{}/adsets", normalize_account_id(&query.account_id));
        let options = ListOptions {
            limit: query.limit,
            after: query.after.clone(),
        };
        self.list(&path, AD_SET_FIELDS, &options).await
    }

    pub fn ad_sets_stream(
        &self,
        account_id: &str,
        limit: u32,
    ) -> impl Stream<Item = Result<AdSet>> + '_ {
        let path = format!("{}/adsets", normalize_account_id(account_id));
        self.list_stream(path, AD_SET_FIELDS, limit)
    }

    /// Create an ad set under a campaign.
    ///
    /// Ad sets are created on the owning account's edge, so the campaign is
    /// read first to learn its `account_id`.
    pub async fn create_ad_set(
        &self,
        campaign_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<CreatedObject> {
        let campaign: Campaign = self
            .get(campaign_id, &[("fields", "id,account_id".to_string())])
            .await?;
        let account_id = campaign.account_id.ok_or_else(|| Error::MissingField {
            object: format!("campaign {}", campaign_id),
            field: "account_id",
        })?;

        let mut body = fields.clone();
        body.insert(
            "campaign_id".to_string(),
            Value::String(campaign_id.to_string()),
        );

        let path = format!("{}/adsets", normalize_account_id(&account_id));
        tracing::info!(campaign_id = campaign_id, account_id = %path, "Creating ad set");
        let created: CreatedObject = self
            .send(Method::POST, &path, &[], Some(&Value::Object(body)))
            .await?;
        tracing::info!(ad_set_id = %created.id, "Ad set created");
        Ok(created)
    }

    // ==============================================================================================
    // Funding sources, pages, permissions
    // ==============================================================================================

    /// Payment methods attached to an account.
    ///
    /// An empty list means the account has none. Missing permission is not
    /// folded into the empty case; it surfaces as `ApiError::PermissionDenied`.
    pub async fn get_funding_sources(&self, account_id: &str) -> Result<Vec<FundingSource>> {
        let path = normalize_account_id(account_id);
        let envelope: FundingSourceEnvelope = self
            .get(&path, &[("fields", FUNDING_SOURCE_FIELDS.to_string())])
            .await?;
        Ok(envelope
            .funding_source_details
            .map(|details| details.into_vec())
            .unwrap_or_default())
    }

    /// Facebook Pages the token's user manages
    pub async fn get_pages(&self) -> Result<Vec<Page>> {
        self.list_stream("me/accounts".to_string(), PAGE_FIELDS, DEFAULT_PAGE_SIZE)
            .try_collect()
            .await
    }

    /// Publication, verification and Business Manager state of one Page
    pub async fn get_page(&self, page_id: &str) -> Result<PageDetails> {
        self.get(page_id.trim(), &[("fields", PAGE_DETAIL_FIELDS.to_string())])
            .await
    }

    /// Roles and tasks `user` holds on an ad account, following all pages
    pub async fn get_account_user_permissions(
        &self,
        account_id: &str,
        user: &str,
    ) -> Result<Vec<AccountUserPermission>> {
        let path = format!("{}/userpermissions", normalize_account_id(account_id));
        let user = user.to_string();
        let path = &path;
        let user = &user;

        paginate(move |after| async move {
            let mut query = vec![("user", user.clone())];
            if let Some(after) = after {
                query.push(("after", after));
            }
            self.get(path, &query).await
        })
        .try_collect()
        .await
    }

    /// Revoke every permission the user granted to the app (logs the user out of the app)
    pub async fn revoke_permissions(&self) -> Result<bool> {
        let response: SuccessResponse = self
            .send(Method::DELETE, "me/permissions", &[], None)
            .await?;
        Ok(response.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;

    fn client_for(host: &str, version: &str) -> MetaApiClient {
        let auth = AuthManager::new(AuthConfig {
            access_token: "EAAB-test".to_string(),
            api_version: Some(version.to_string()),
            graph_host: Some(host.to_string()),
        })
        .unwrap();
        MetaApiClient::from_auth(Arc::new(auth)).unwrap()
    }

    #[test]
    fn test_endpoint_formatting() {
        let client = client_for("https://graph.facebook.com", "v23.0");
        assert_eq!(
            client.endpoint("me/adaccounts"),
            "https://graph.facebook.com/v23.0/me/adaccounts"
        );
        assert_eq!(
            client.endpoint("/act_1/campaigns"),
            "https://graph.facebook.com/v23.0/act_1/campaigns"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = client_for("http://127.0.0.1:1", "v24.0");
        let err = client.get_ad_account("123").await.unwrap_err();
        assert!(err.is_network());
    }
}
