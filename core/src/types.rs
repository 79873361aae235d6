//! Domain DTOs for the accounts API.
//!
//! # Design
//! The wire format distinguishes an absent field from an empty one, so every
//! attribute is an `Option` and absent values are omitted on serialization
//! rather than written as `null` or a zero value. These types mirror the
//! mock-server's schema but are defined independently; integration tests
//! catch any drift between the two crates.

use serde::{Deserialize, Serialize};

/// Wire wrapper carrying a value under the `data` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data: Some(data) }
    }
}

/// An account resource exchanged with the service.
///
/// `id` is only required to be a UUID by the fetch and delete operations;
/// the model itself accepts any string. `version` is assigned by the server
/// on create and required by delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub organisation_id: String,
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AccountAttributes>,
}

impl Account {
    /// An `accounts`-typed resource with no version and no attributes.
    pub fn new(id: impl Into<String>, organisation_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            organisation_id: organisation_id.into(),
            account_type: "accounts".to_string(),
            version: None,
            attributes: None,
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_attributes(mut self, attributes: AccountAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

/// Descriptive attributes of an account. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_matching_opt_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_account: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switched: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_identification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
}
