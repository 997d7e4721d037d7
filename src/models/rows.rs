//! Internal row models
//!
//! These mirror the user-service Postgres tables column for column; serde
//! field names are the column names. Optional columns are `Option` so an
//! absent upstream value stays distinct from a zero value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BAccount {
    pub id: i64,
    pub account_number: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub business_type: Option<String>,
    pub legal_entity: i32,
    pub number_of_employee: i32,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BAccountContact {
    pub id: i64,
    pub account_id: i64,
    pub contact_id: i64,
    pub is_primary: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BAccountTemporary {
    pub id: i64,
    pub account_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BContact {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BAddress {
    pub id: i64,
    pub contact_id: i64,
    pub label: Option<String>,
    pub street: Option<String>,
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    pub district_id: Option<i64>,
    pub sub_district_id: Option<i64>,
    pub postal_code: Option<String>,
    pub is_primary: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BPhone {
    pub id: i64,
    pub contact_id: i64,
    pub number: Option<String>,
    pub phone_type: Option<String>,
    pub is_primary: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BDocument {
    pub id: i64,
    pub account_id: i64,
    pub document_type: Option<String>,
    pub document_file: Option<String>,
    pub document_number: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BContactNpwp {
    pub id: i64,
    pub contact_id: i64,
    /// Digits only
    pub npwp_number: Option<String>,
    pub npwp_name: Option<String>,
    pub npwp_address: Option<String>,
    pub npwp_file: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BContactAddress {
    pub id: i64,
    pub contact_id: i64,
    pub address_id: i64,
    pub address_type: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BContactTemp {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub token: Option<String>,
    pub status: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BLeads {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2BContactDocument {
    pub id: i64,
    pub contact_id: i64,
    pub document_type: Option<String>,
    pub document_file: Option<String>,
    pub document_number: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Merchant row replicated from the Shark merchant table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2CMerchant {
    pub id: String,
    pub user_id: Option<String>,
    pub merchant_name: Option<String>,
    pub vanity_url: Option<String>,
    pub merchant_category: Option<String>,
    pub business_type: Option<String>,
    pub legal_entity: i32,
    pub number_of_employee: i32,
    pub company_name: Option<String>,
    pub npwp: Option<String>,
    pub is_pkp: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Merchant row owned by GWS, including the denormalized address and bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2CMerchantDataV2 {
    pub id: String,
    pub user_id: Option<String>,
    pub merchant_name: Option<String>,
    pub merchant_email: Option<String>,
    pub phone_number: Option<String>,
    pub mobile_phone_number: Option<String>,
    pub vanity_url: Option<String>,
    pub description: Option<String>,
    pub business_type: Option<String>,
    pub legal_entity: i32,
    pub legal_entity_name: Option<String>,
    pub number_of_employee: i32,
    pub company_name: Option<String>,
    pub npwp: Option<String>,
    pub is_pkp: bool,
    pub is_active: bool,
    pub store_closure_date: Option<DateTime<Utc>>,
    pub store_reopen_date: Option<DateTime<Utc>>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub province_id: Option<i64>,
    pub province_name: Option<String>,
    pub city_id: Option<i64>,
    pub city_name: Option<String>,
    pub district_id: Option<i64>,
    pub district_name: Option<String>,
    pub sub_district_id: Option<i64>,
    pub sub_district_name: Option<String>,
    pub bank_id: Option<i64>,
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub source: String,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2CMerchantDocument {
    pub id: String,
    pub merchant_id: String,
    pub document_type: String,
    pub document_value: Option<String>,
    pub document_expiration_date: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// A merchant's payout bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2CMerchantBankAccount {
    pub id: i64,
    pub merchant_id: String,
    pub bank_id: Option<i64>,
    pub bank_branch: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Master list of banks merchants can pay out to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2CMerchantBank {
    pub id: i64,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: String,
    pub member_id: String,
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    pub district_id: Option<i64>,
    pub sub_district_id: Option<i64>,
    pub label: Option<String>,
    pub is_primary: bool,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Audit row written after a successful Dolphin CRM call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DolphinLog {
    pub id: String,
    pub member_id: Option<String>,
    pub email: String,
    pub event_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
