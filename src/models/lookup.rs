//! Static code translation tables
//!
//! Shark and GWS identify document and business types with their own codes.
//! Unknown codes pass through lower-cased so new upstream values still land
//! in the row instead of being dropped.

/// Translate an upstream document type code into the internal document type.
pub fn document_type(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    let mapped = match normalized.as_str() {
        "1" | "ktp" | "ktp_file" => "ktp",
        "2" | "npwp" | "npwp_file" => "npwp",
        "3" | "siup" => "siup",
        "4" | "tdp" => "tdp",
        "5" | "nib" => "nib",
        "6" | "akta" | "akta_pendirian" => "akta-pendirian",
        "7" | "sk" | "sk_kemenkumham" => "sk-kemenkumham",
        "8" | "skdp" => "skdp",
        "9" | "rekening" | "bank_book" | "buku_tabungan" => "buku-tabungan",
        _ => return normalized,
    };
    mapped.to_string()
}

/// Translate an upstream business type code.
pub fn business_type(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    let mapped = match normalized.as_str() {
        "1" | "individual" | "perorangan" | "personal" => "perorangan",
        "2" | "company" | "perusahaan" | "corporate" => "perusahaan",
        _ => return normalized,
    };
    mapped.to_string()
}

/// Display name for a GWS legal entity id; `0` means not provided.
pub fn legal_entity_name(id: i32) -> Option<&'static str> {
    match id {
        1 => Some("PT"),
        2 => Some("CV"),
        3 => Some("Firma"),
        4 => Some("Koperasi"),
        5 => Some("UD"),
        6 => Some("Perorangan"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_codes() {
        assert_eq!(document_type("KTP"), "ktp");
        assert_eq!(document_type("2"), "npwp");
        assert_eq!(document_type(" akta "), "akta-pendirian");
        assert_eq!(document_type("BANK_BOOK"), "buku-tabungan");
    }

    #[test]
    fn test_unknown_document_type_passes_through() {
        assert_eq!(document_type("SERTIFIKAT_HALAL"), "sertifikat_halal");
    }

    #[test]
    fn test_business_type_codes() {
        assert_eq!(business_type("1"), "perorangan");
        assert_eq!(business_type("Company"), "perusahaan");
        assert_eq!(business_type("bumn"), "bumn");
    }

    #[test]
    fn test_legal_entity_names() {
        assert_eq!(legal_entity_name(1), Some("PT"));
        assert_eq!(legal_entity_name(0), None);
        assert_eq!(legal_entity_name(99), None);
    }
}
