//! Counterparty identification types (SII `IDType`).

use serde::{Deserialize, Serialize};

use super::countries::is_eu_member;
use super::types::Party;

/// How a counterparty is identified towards the tax authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    /// Spanish NIF, rendered as a plain `NIF` field.
    Nif,
    /// 02: VAT identification number (NIF-IVA).
    NifIva,
    /// 03: Passport.
    Passport,
    /// 04: Official identification document of the country of residence.
    OfficialDocument,
    /// 05: Residence certificate.
    ResidenceCertificate,
    /// 06: Other supporting document.
    Other,
    /// 07: Not registered in the census.
    NotOnFile,
}

impl IdType {
    /// SII `IDType` code. `Nif` has none: it renders as a plain NIF field.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Nif => None,
            Self::NifIva => Some("02"),
            Self::Passport => Some("03"),
            Self::OfficialDocument => Some("04"),
            Self::ResidenceCertificate => Some("05"),
            Self::Other => Some("06"),
            Self::NotOnFile => Some("07"),
        }
    }

    /// Parse from the SII `IDType` code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "02" => Some(Self::NifIva),
            "03" => Some(Self::Passport),
            "04" => Some(Self::OfficialDocument),
            "05" => Some(Self::ResidenceCertificate),
            "06" => Some(Self::Other),
            "07" => Some(Self::NotOnFile),
            _ => None,
        }
    }
}

/// All `IDType` codes accepted in an `IDOtro` block.
pub const ID_TYPE_CODES: &[&str] = &["02", "03", "04", "05", "06", "07"];

/// Classifies a counterparty into an [`IdType`].
///
/// The declaration builder calls this for every counterparty; callers with
/// richer partner data (passports, residence certificates) supply their own
/// implementation.
pub trait CounterpartyClassifier {
    fn classify(&self, party: &Party) -> IdType;
}

impl<F> CounterpartyClassifier for F
where
    F: Fn(&Party) -> IdType,
{
    fn classify(&self, party: &Party) -> IdType {
        self(party)
    }
}

/// Default classifier driven by the country reference tables.
///
/// Spanish parties use their NIF, EU parties their VAT number, everyone
/// else an "other document" identification.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryClassifier;

impl CounterpartyClassifier for CountryClassifier {
    fn classify(&self, party: &Party) -> IdType {
        if party.is_domestic() {
            IdType::Nif
        } else if is_eu_member(&party.country_code) {
            IdType::NifIva
        } else {
            IdType::Other
        }
    }
}
