// Graph API resource models

pub mod meta;

pub use meta::{
    normalize_account_id, AccountUserPermission, AdAccount, AdSet, AdSetQuery, Campaign,
    CreatedObject, FundingSource, ListOptions, ObjectRef, Page, PageDetails,
};
