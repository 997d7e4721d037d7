//! Restructuring external records into internal rows
//!
//! Every function here is pure: no IO, no clock reads except the explicit
//! `now` handed in by the caller. A record missing its primary key is a
//! validation error; every other gap becomes an empty column.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{ValidationError, ValidationResult};
use super::gws::{GwsMasterMerchantBank, GwsMerchantData, GwsRegion};
use super::lookup::{business_type, document_type, legal_entity_name};
use super::rows::*;
use super::shark::*;

/// Row source label for merchants written from GWS events
pub const GWS_SOURCE: &str = "gws";

/// A CDC row image together with the internal row it restructures into.
///
/// Implementing this is all a replicated table needs to get a handler; the
/// decode, dispatch and persistence steps are shared.
pub trait CdcEntity: DeserializeOwned + Send + 'static {
    /// Entity name used in logs
    const NAME: &'static str;

    /// Internal row persisted for this entity
    type Row: Serialize + Send + Sync + 'static;

    /// Primary key of an image, read without restructuring the rest of it.
    /// Delete events often carry nothing but the key.
    fn key(&self) -> Option<String>;

    fn restructure(self) -> ValidationResult<Self::Row>;
}

fn required<T>(value: Option<T>, entity: &str, field: &str) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::required(entity, field))
}

fn digits_only(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.chars().filter(|c| c.is_ascii_digit()).collect::<String>())
        .filter(|v| !v.is_empty())
}

fn region(region: &Option<GwsRegion>) -> (Option<i64>, Option<String>) {
    match region {
        Some(r) => (r.id, r.name.clone()),
        None => (None, None),
    }
}

impl CdcEntity for SharkAccount {
    const NAME: &'static str = "account";
    type Row = B2BAccount;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BAccount> {
        Ok(B2BAccount {
            id: required(self.id, Self::NAME, "id")?,
            account_number: self.account_number,
            name: self.name,
            email: self.email,
            business_type: self.business_type.as_deref().map(business_type),
            legal_entity: self.legal_entity,
            number_of_employee: self.number_of_employee,
            is_active: self.is_active,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkAccountContact {
    const NAME: &'static str = "account_contact";
    type Row = B2BAccountContact;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BAccountContact> {
        Ok(B2BAccountContact {
            id: required(self.id, Self::NAME, "id")?,
            account_id: required(self.account_id, Self::NAME, "accountId")?,
            contact_id: required(self.contact_id, Self::NAME, "contactId")?,
            is_primary: self.is_primary,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkAccountTemporary {
    const NAME: &'static str = "account_temporary";
    type Row = B2BAccountTemporary;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BAccountTemporary> {
        Ok(B2BAccountTemporary {
            id: required(self.id, Self::NAME, "id")?,
            account_id: self.account_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            status: self.status,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkContact {
    const NAME: &'static str = "contact";
    type Row = B2BContact;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BContact> {
        Ok(B2BContact {
            id: required(self.id, Self::NAME, "id")?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.map(|e| e.to_lowercase()),
            phone: self.phone,
            gender: self.gender,
            birth_date: self.birth_date,
            is_active: self.is_active,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkAddress {
    const NAME: &'static str = "address";
    type Row = B2BAddress;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BAddress> {
        Ok(B2BAddress {
            id: required(self.id, Self::NAME, "id")?,
            contact_id: required(self.contact_id, Self::NAME, "contactId")?,
            label: self.label,
            street: self.street,
            province_id: self.province_id,
            city_id: self.city_id,
            district_id: self.district_id,
            sub_district_id: self.sub_district_id,
            postal_code: self.postal_code,
            is_primary: self.is_primary,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkPhone {
    const NAME: &'static str = "phone";
    type Row = B2BPhone;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BPhone> {
        Ok(B2BPhone {
            id: required(self.id, Self::NAME, "id")?,
            contact_id: required(self.contact_id, Self::NAME, "contactId")?,
            number: self.number,
            phone_type: self.phone_type,
            is_primary: self.is_primary,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkDocument {
    const NAME: &'static str = "document";
    type Row = B2BDocument;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BDocument> {
        Ok(B2BDocument {
            id: required(self.id, Self::NAME, "id")?,
            account_id: required(self.account_id, Self::NAME, "accountId")?,
            document_type: self.document_type.as_deref().map(document_type),
            document_file: self.document_file,
            document_number: self.document_number,
            is_active: self.is_active,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkContactNpwp {
    const NAME: &'static str = "contact_npwp";
    type Row = B2BContactNpwp;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BContactNpwp> {
        Ok(B2BContactNpwp {
            id: required(self.id, Self::NAME, "id")?,
            contact_id: required(self.contact_id, Self::NAME, "contactId")?,
            npwp_number: digits_only(self.npwp_number),
            npwp_name: self.npwp_name,
            npwp_address: self.npwp_address,
            npwp_file: self.npwp_file,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkContactAddress {
    const NAME: &'static str = "contact_address";
    type Row = B2BContactAddress;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BContactAddress> {
        Ok(B2BContactAddress {
            id: required(self.id, Self::NAME, "id")?,
            contact_id: required(self.contact_id, Self::NAME, "contactId")?,
            address_id: required(self.address_id, Self::NAME, "addressId")?,
            address_type: self.address_type,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkContactTemp {
    const NAME: &'static str = "contact_temp";
    type Row = B2BContactTemp;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BContactTemp> {
        Ok(B2BContactTemp {
            id: required(self.id, Self::NAME, "id")?,
            email: self.email.map(|e| e.to_lowercase()),
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            token: self.token,
            status: self.status,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkLeads {
    const NAME: &'static str = "leads";
    type Row = B2BLeads;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BLeads> {
        Ok(B2BLeads {
            id: required(self.id, Self::NAME, "id")?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company_name: self.company_name,
            source: self.source,
            status: self.status,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkMerchant {
    const NAME: &'static str = "merchant";
    type Row = B2CMerchant;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2CMerchant> {
        Ok(B2CMerchant {
            id: required(self.id, Self::NAME, "id")?,
            user_id: self.user_id,
            merchant_name: self.merchant_name,
            vanity_url: self.vanity_url,
            merchant_category: self.merchant_category,
            business_type: self.business_type.as_deref().map(business_type),
            legal_entity: self.legal_entity,
            number_of_employee: self.number_of_employee,
            company_name: self.company_name,
            npwp: digits_only(self.npwp),
            is_pkp: self.is_pkp,
            is_active: self.is_active,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkMerchantDocument {
    const NAME: &'static str = "merchant_document";
    type Row = B2CMerchantDocument;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2CMerchantDocument> {
        let merchant_id = required(self.merchant_id, Self::NAME, "merchantId")?;
        let document_type =
            document_type(&required(self.document_type, Self::NAME, "documentType")?);
        let id = match self.id {
            Some(id) => id,
            None => document_id(&merchant_id, &document_type),
        };

        Ok(B2CMerchantDocument {
            id,
            merchant_id,
            document_type,
            document_value: self.document_value,
            document_expiration_date: self.document_expiration_date,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkMerchantBank {
    const NAME: &'static str = "merchant_bank";
    type Row = B2CMerchantBankAccount;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2CMerchantBankAccount> {
        Ok(B2CMerchantBankAccount {
            id: required(self.id, Self::NAME, "id")?,
            merchant_id: required(self.merchant_id, Self::NAME, "merchantId")?,
            bank_id: self.bank_id,
            bank_branch: self.bank_branch,
            account_number: digits_only(self.account_number),
            account_name: self.account_name,
            is_active: self.is_active,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkShippingAddress {
    const NAME: &'static str = "shipping_address";
    type Row = ShippingAddress;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<ShippingAddress> {
        Ok(ShippingAddress {
            id: required(self.id, Self::NAME, "id")?,
            member_id: required(self.member_id, Self::NAME, "memberId")?,
            name: self.name,
            mobile: self.mobile,
            phone: self.phone,
            street: self.street,
            postal_code: self.postal_code,
            province_id: self.province_id,
            city_id: self.city_id,
            district_id: self.district_id,
            sub_district_id: self.sub_district_id,
            label: self.label,
            is_primary: self.is_primary,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

impl CdcEntity for SharkContactDocument {
    const NAME: &'static str = "contact_document";
    type Row = B2BContactDocument;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }

    fn restructure(self) -> ValidationResult<B2BContactDocument> {
        Ok(B2BContactDocument {
            id: required(self.id, Self::NAME, "id")?,
            contact_id: required(self.contact_id, Self::NAME, "contactId")?,
            document_type: self.document_type.as_deref().map(document_type),
            document_file: self.document_file,
            document_number: self.document_number,
            is_deleted: false,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

/// Deterministic document id so redelivered GWS events upsert the same rows.
pub fn document_id(merchant_id: &str, document_type: &str) -> String {
    format!("{}-{}", merchant_id, document_type)
}

/// Restructure a GWS merchant aggregate into its merchant row and document
/// rows. Documents without a type are dropped.
pub fn gws_merchant(
    data: GwsMerchantData,
) -> ValidationResult<(B2CMerchantDataV2, Vec<B2CMerchantDocument>)> {
    let id = required(data.id, "gws_merchant", "id")?;

    let documents = data
        .documents
        .into_iter()
        .filter_map(|doc| {
            let document_type = document_type(doc.document_type.as_deref()?);
            Some(B2CMerchantDocument {
                id: document_id(&id, &document_type),
                merchant_id: id.clone(),
                document_type,
                document_value: doc.document_value,
                document_expiration_date: doc.document_expiration_date,
                is_deleted: false,
                created_at: data.created_at,
                modified_at: data.modified_at,
            })
        })
        .collect();

    let (province_id, province_name) = region(&data.province);
    let (city_id, city_name) = region(&data.city);
    let (district_id, district_name) = region(&data.district);
    let (sub_district_id, sub_district_name) = region(&data.sub_district);
    let bank = data.bank.unwrap_or_default();

    let row = B2CMerchantDataV2 {
        id,
        user_id: data.user_id,
        merchant_name: data.merchant_name,
        merchant_email: data.merchant_email.map(|e| e.to_lowercase()),
        phone_number: data.phone_number,
        mobile_phone_number: data.mobile_phone_number,
        vanity_url: data.vanity_url,
        description: data.description,
        business_type: data.business_type.as_deref().map(business_type),
        legal_entity: data.legal_entity,
        legal_entity_name: legal_entity_name(data.legal_entity).map(str::to_string),
        number_of_employee: data.number_of_employee,
        company_name: data.company_name,
        npwp: digits_only(data.npwp),
        is_pkp: data.is_pkp,
        is_active: data.is_active,
        store_closure_date: data.store_closure_date,
        store_reopen_date: data.store_reopen_date,
        street: data.street,
        postal_code: data.postal_code,
        province_id,
        province_name,
        city_id,
        city_name,
        district_id,
        district_name,
        sub_district_id,
        sub_district_name,
        bank_id: bank.bank_id,
        bank_name: bank.bank_name,
        bank_branch: bank.bank_branch,
        account_number: digits_only(bank.account_number),
        account_name: bank.account_name,
        source: GWS_SOURCE.to_string(),
        is_deleted: false,
        created_at: data.created_at,
        created_by: data.created_by,
        modified_at: data.modified_at,
        modified_by: data.modified_by,
        deleted_at: None,
    };

    Ok((row, documents))
}

/// Turn a merchant row into its deleted form: inactive, with `deleted_at`.
pub fn mark_merchant_deleted(row: &mut B2CMerchantDataV2, now: DateTime<Utc>) {
    row.is_active = false;
    row.deleted_at = Some(now);
    row.modified_at = Some(now);
}

pub fn gws_master_bank(data: GwsMasterMerchantBank) -> ValidationResult<B2CMerchantBank> {
    Ok(B2CMerchantBank {
        id: required(data.id, "gws_merchant_bank", "id")?,
        bank_code: data.bank_code,
        bank_name: data.bank_name,
        is_active: data.is_active,
        is_deleted: false,
        created_at: data.created_at,
        created_by: data.created_by,
        modified_at: data.modified_at,
        modified_by: data.modified_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::ValidationErrorKind;
    use serde_json::json;

    #[test]
    fn test_cdc_merchant_restructure() {
        let image: SharkMerchant =
            serde_json::from_value(json!({"id": "MCH1701", "merchantName": "Acme", "npwp": "01.234.567.8-901.000"}))
                .unwrap();
        let row = image.restructure().unwrap();
        assert_eq!(row.id, "MCH1701");
        assert_eq!(row.merchant_name.as_deref(), Some("Acme"));
        assert_eq!(row.npwp.as_deref(), Some("012345678901000"));
        assert!(!row.is_deleted);
    }

    #[test]
    fn test_missing_primary_key_is_validation_error() {
        let image: SharkAccount = serde_json::from_value(json!({"name": "no id"})).unwrap();
        let err = image.restructure().unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::RequiredField);
        assert_eq!(err.field, "id");
    }

    #[test]
    fn test_document_codes_translated() {
        let image: SharkDocument =
            serde_json::from_value(json!({"id": 5, "accountId": 9, "documentType": "2"})).unwrap();
        assert_eq!(image.restructure().unwrap().document_type.as_deref(), Some("npwp"));
    }

    #[test]
    fn test_gws_merchant_restructure() {
        let data: GwsMerchantData = serde_json::from_value(json!({
            "id": "MCH9",
            "legalEntity": "1",
            "numberOfEmployee": "",
            "businessType": "Company",
            "city": {"id": 3171, "name": "Jakarta Pusat"},
            "bank": {"bankId": 14, "bankName": "BCA", "accountNumber": "123-456"},
            "documents": [
                {"documentType": "KTP", "documentValue": "3171"},
                {"documentValue": "untyped"}
            ],
            "createdAt": "",
            "modifiedAt": "2024-01-15T10:30:00Z"
        }))
        .unwrap();

        let (row, documents) = gws_merchant(data).unwrap();
        assert_eq!(row.legal_entity, 1);
        assert_eq!(row.legal_entity_name.as_deref(), Some("PT"));
        assert_eq!(row.number_of_employee, 0);
        assert_eq!(row.business_type.as_deref(), Some("perusahaan"));
        assert_eq!(row.city_id, Some(3171));
        assert_eq!(row.account_number.as_deref(), Some("123456"));
        assert_eq!(row.source, GWS_SOURCE);
        assert!(row.created_at.is_none());
        assert!(row.modified_at.is_some());

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "MCH9-ktp");
        assert_eq!(documents[0].merchant_id, "MCH9");
    }

    #[test]
    fn test_gws_oversized_legal_entity_has_no_name() {
        let data: GwsMerchantData = serde_json::from_value(json!({
            "id": "MCH9",
            "legalEntity": 4294967297u64,
            "numberOfEmployee": 3000000000u64
        }))
        .unwrap();

        let (row, _) = gws_merchant(data).unwrap();
        assert_eq!(row.legal_entity, 0);
        assert_eq!(row.legal_entity_name, None);
        assert_eq!(row.number_of_employee, 0);
    }

    #[test]
    fn test_mark_merchant_deleted() {
        let data: GwsMerchantData =
            serde_json::from_value(json!({"id": "MCH9", "isActive": true})).unwrap();
        let (mut row, _) = gws_merchant(data).unwrap();
        let now = Utc::now();
        mark_merchant_deleted(&mut row, now);
        assert!(!row.is_active);
        assert_eq!(row.deleted_at, Some(now));
    }
}
