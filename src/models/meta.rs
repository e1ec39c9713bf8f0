use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==================================================================================================
// Field selections
// ==================================================================================================

pub const AD_ACCOUNT_FIELDS: &str =
    "id,account_id,name,account_status,currency,balance,amount_spent,spend_cap,timezone_name,business";

pub const CAMPAIGN_FIELDS: &str =
    "id,account_id,name,objective,status,effective_status,daily_budget,lifetime_budget,special_ad_categories,created_time,updated_time";

pub const AD_SET_FIELDS: &str =
    "id,account_id,campaign_id,name,status,effective_status,daily_budget,lifetime_budget,optimization_goal,billing_event,targeting,promoted_object,created_time";

pub const FUNDING_SOURCE_FIELDS: &str = "funding_source,funding_source_details";

pub const PAGE_FIELDS: &str = "id,name,category,tasks,access_token";

pub const PAGE_DETAIL_FIELDS: &str =
    "id,name,category,is_published,is_verified,business,restriction_info,access_token";

/// `account_status` value of an active ad account
pub const ACCOUNT_STATUS_ACTIVE: i64 = 1;

// ==================================================================================================
// Entities
// ==================================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_spent: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdAccount {
    pub fn is_active(&self) -> bool {
        self.account_status == Some(ACCOUNT_STATUS_ACTIVE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_budget: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdSet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_event: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_string: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Facebook Page the token's user can act on
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Page {
    pub fn has_task(&self, task: &str) -> bool {
        self.tasks.iter().any(|t| t == task)
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("tasks", &self.tasks)
            .field("has_access_token", &self.access_token.is_some())
            .finish()
    }
}

/// `{id, name}` reference to another Graph object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Publication and ownership state of a single Page
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDetails {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    /// Owning Business Manager, absent when the Page is not attached to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageDetails {
    pub fn is_restricted(&self) -> bool {
        self.restriction_info
            .as_ref()
            .is_some_and(|info| !info.is_null() && info != &Value::Object(Map::new()))
    }
}

impl std::fmt::Debug for PageDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDetails")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_published", &self.is_published)
            .field("is_verified", &self.is_verified)
            .field("business", &self.business)
            .field("restriction_info", &self.restriction_info)
            .field("has_access_token", &self.access_token.is_some())
            .finish()
    }
}

/// One entry of an ad account's `userpermissions` edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUserPermission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of a create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedObject {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `DELETE me/permissions`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

/// Funding source details arrive either as one object or as a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FundingSourceEnvelope {
    #[serde(default)]
    pub funding_source_details: Option<OneOrMany<FundingSource>>,
}

// ==================================================================================================
// Queries
// ==================================================================================================

/// Page size and cursor for a single list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub after: Option<String>,
}

impl ListOptions {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            after: None,
        }
    }
}

/// Ad set listing for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdSetQuery {
    pub account_id: String,
    pub limit: Option<u32>,
    pub after: Option<String>,
}

/// Prefix a bare ad account id with `act_`
pub fn normalize_account_id(account_id: &str) -> String {
    let trimmed = account_id.trim();
    if trimmed.starts_with("act_") {
        trimmed.to_string()
    } else {
        format!("act_{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_account_id() {
        assert_eq!(normalize_account_id("123"), "act_123");
        assert_eq!(normalize_account_id("act_123"), "act_123");
        assert_eq!(
            normalize_account_id(&normalize_account_id(" 456 ")),
            "act_456"
        );
    }

    #[test]
    fn test_ad_account_keeps_unknown_fields() {
        let account: AdAccount = serde_json::from_str(
            r#"{"id":"act_1","name":"Main","account_status":1,"currency":"EUR",
                "timezone_name":"Europe/Rome","business":{"id":"9"}}"#,
        )
        .unwrap();
        assert!(account.is_active());
        assert_eq!(account.currency.as_deref(), Some("EUR"));
        assert_eq!(account.extra["timezone_name"], "Europe/Rome");
        assert_eq!(account.extra["business"]["id"], "9");
    }

    #[test]
    fn test_funding_source_details_shapes() {
        let single: FundingSourceEnvelope = serde_json::from_str(
            r#"{"id":"act_1","funding_source_details":{"id":"77","display_string":"Visa *1234","type":1}}"#,
        )
        .unwrap();
        let sources = single.funding_source_details.unwrap().into_vec();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].display_string.as_deref(), Some("Visa *1234"));

        let many: FundingSourceEnvelope = serde_json::from_str(
            r#"{"funding_source_details":[{"id":"1"},{"id":"2"}]}"#,
        )
        .unwrap();
        assert_eq!(many.funding_source_details.unwrap().into_vec().len(), 2);

        let none: FundingSourceEnvelope = serde_json::from_str(r#"{"id":"act_1"}"#).unwrap();
        assert!(none.funding_source_details.is_none());
    }

    #[test]
    fn test_page_debug_hides_token() {
        let page: Page = serde_json::from_str(
            r#"{"id":"1","name":"Shop","tasks":["ADVERTISE","ANALYZE"],"access_token":"EAAPsecret"}"#,
        )
        .unwrap();
        assert!(page.has_task("ADVERTISE"));
        assert!(!page.has_task("CREATE_CONTENT"));
        assert!(!format!("{:?}", page).contains("EAAPsecret"));
    }

    #[test]
    fn test_page_details() {
        let page: PageDetails = serde_json::from_str(
            r#"{"id":"5","name":"Shop","is_published":true,"is_verified":false,
                "business":{"id":"77","name":"Acme"},"access_token":"EAAPsecret"}"#,
        )
        .unwrap();
        assert_eq!(page.is_published, Some(true));
        assert_eq!(page.business.as_ref().and_then(|b| b.name.as_deref()), Some("Acme"));
        assert!(!page.is_restricted());
        assert!(!format!("{:?}", page).contains("EAAPsecret"));

        let restricted: PageDetails =
            serde_json::from_str(r#"{"id":"5","restriction_info":{"type":"AGE"}}"#).unwrap();
        assert!(restricted.is_restricted());
        assert!(restricted.business.is_none());
    }
}
