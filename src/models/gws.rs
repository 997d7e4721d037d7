//! GWS API objects
//!
//! GWS publishes its merchant aggregate as one nested object: the merchant
//! itself, its payout bank, its legal documents and its address hierarchy.
//! Server-side nullable fields (`legalEntity`, `numberOfEmployee`, the
//! timestamps) are coerced instead of rejected.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::coerce::{
    lenient_bool, lenient_i32, lenient_opt_i64, lenient_string, lenient_timestamp,
    null_as_default,
};

/// Merchant aggregate carried in `GwsEnvelope::data`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GwsMerchantData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vanity_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub business_type: Option<String>,

    /// `null`, `""` and absence all mean 0
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
    pub store_closure_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub store_reopen_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub province: Option<GwsRegion>,
    #[serde(default)]
    pub city: Option<GwsRegion>,
    #[serde(default)]
    pub district: Option<GwsRegion>,
    #[serde(default)]
    pub sub_district: Option<GwsRegion>,

    #[serde(default)]
    pub bank: Option<GwsMerchantBankInfo>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<GwsMerchantDocument>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub modified_by: Option<String>,
}

/// One level of the address hierarchy
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GwsRegion {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GwsMerchantBankInfo {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub bank_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GwsMerchantDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub document_expiration_date: Option<DateTime<Utc>>,
}

/// Master bank record carried on the merchant-bank topic
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GwsMasterMerchantBank {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub modified_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> GwsMerchantData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_nullable_legal_entity_forms() {
        assert_eq!(decode(json!({"legalEntity": 1})).legal_entity, 1);
        assert_eq!(decode(json!({})).legal_entity, 0);
        assert_eq!(decode(json!({"legalEntity": null})).legal_entity, 0);
        assert_eq!(decode(json!({"legalEntity": ""})).legal_entity, 0);
    }

    #[test]
    fn test_nullable_number_of_employee_forms() {
        assert_eq!(decode(json!({"numberOfEmployee": 1})).number_of_employee, 1);
        assert_eq!(decode(json!({})).number_of_employee, 0);
        assert_eq!(decode(json!({"numberOfEmployee": null})).number_of_employee, 0);
        assert_eq!(decode(json!({"numberOfEmployee": ""})).number_of_employee, 0);
    }

    #[test]
    fn test_nested_aggregate() {
        let data = decode(json!({
            "id": "MCH1",
            "province": {"id": 31, "name": "DKI Jakarta"},
            "subDistrict": {"id": "3171", "name": "Menteng"},
            "bank": {"bankId": 14, "accountNumber": "123"},
            "documents": [{"documentType": "KTP", "documentValue": "317"}],
            "storeClosureDate": "",
            "modifiedAt": "yesterday"
        }));

        assert_eq!(data.province.as_ref().and_then(|r| r.id), Some(31));
        assert_eq!(data.sub_district.as_ref().and_then(|r| r.id), Some(3171));
        assert_eq!(data.bank.as_ref().and_then(|b| b.bank_id), Some(14));
        assert_eq!(data.documents.len(), 1);
        assert!(data.store_closure_date.is_none());
        assert!(data.modified_at.is_none());
    }

    #[test]
    fn test_null_documents_is_empty() {
        assert!(decode(json!({"documents": null})).documents.is_empty());
    }
}
