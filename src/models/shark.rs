//! CDC row images
//!
//! One struct per replicated Shark table, shaped like the JSON row image the
//! CDC connector emits (camelCase columns). Every field is lenient: ids and
//! flags can arrive as strings, timestamps as epoch numbers or blank strings.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::coerce::{lenient_bool, lenient_i32, lenient_opt_i64, lenient_string, lenient_timestamp};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkAccount {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub business_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub legal_entity: i32,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub number_of_employee: i32,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkAccountContact {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub account_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub contact_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_primary: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkAccountTemporary {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub account_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkContact {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkAddress {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub contact_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub province_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub city_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub district_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub sub_district_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_primary: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkPhone {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub contact_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_primary: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkDocument {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub account_id: Option<i64>,
    /// Upstream document code, translated through the lookup table
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_file: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkContactNpwp {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub contact_id: Option<i64>,
    /// Formatted as `99.999.999.9-999.999` upstream
    #[serde(default, deserialize_with = "lenient_string")]
    pub npwp_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub npwp_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub npwp_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub npwp_file: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkContactAddress {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub contact_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub address_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkContactTemp {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkLeads {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkMerchant {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vanity_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub business_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub legal_entity: i32,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub number_of_employee: i32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub npwp: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_pkp: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkMerchantDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub document_expiration_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkMerchantBank {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub bank_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkShippingAddress {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub province_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub city_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub district_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub sub_district_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_primary: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkContactDocument {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub contact_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_file: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}
