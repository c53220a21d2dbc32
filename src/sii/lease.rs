//! Leased property block (`DatosInmueble`) for business-premises leases.

use serde::Serialize;

use super::policy::{LEASE_WITH_RETENTION, LEASE_WITHOUT_RETENTION};
use super::record::Node;
use crate::core::LeasedProperty;

/// Autonomous communities with their own fiscal regime (foral territories).
const SPECIAL_FISCAL_REGIONS: &[&str] = &["ES-PV", "ES-NC"];

/// `SituacionInmueble` of a leased property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SitusCode {
    /// 1: Spain outside the foral territories, with cadastral reference.
    Domestic,
    /// 2: Basque Country or Navarre.
    SpecialRegion,
    /// 3: Spain outside the foral territories, no cadastral reference.
    DomesticWithoutReference,
    /// 4: Abroad.
    Foreign,
}

impl SitusCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domestic => "1",
            Self::SpecialRegion => "2",
            Self::DomesticWithoutReference => "3",
            Self::Foreign => "4",
        }
    }
}

/// Whether a declared regime code requires the lease block.
pub fn is_lease_regime(regime_code: &str) -> bool {
    regime_code == LEASE_WITH_RETENTION || regime_code == LEASE_WITHOUT_RETENTION
}

fn cadastral_reference(property: &LeasedProperty) -> Option<&str> {
    property
        .cadastral_reference
        .as_deref()
        .map(str::trim)
        .filter(|reference| !reference.is_empty())
}

pub fn situs_code(property: &LeasedProperty) -> SitusCode {
    if !property.country_code.eq_ignore_ascii_case("ES") {
        return SitusCode::Foreign;
    }
    let special = property.region.as_deref().is_some_and(|region| {
        SPECIAL_FISCAL_REGIONS
            .iter()
            .any(|special| special.eq_ignore_ascii_case(region.trim()))
    });
    if special {
        SitusCode::SpecialRegion
    } else if cadastral_reference(property).is_some() {
        SitusCode::Domestic
    } else {
        SitusCode::DomesticWithoutReference
    }
}

/// Render `DatosInmueble`.
///
/// Without a property the detail node is left empty so that validation
/// reports the missing situs instead of the builder inventing one.
pub fn lease_block(property: Option<&LeasedProperty>) -> Node {
    let detail = match property {
        Some(property) => {
            let situs = situs_code(property);
            let reference = cadastral_reference(property)
                .filter(|_| situs != SitusCode::DomesticWithoutReference);
            Node::new()
                .with("SituacionInmueble", situs.code())
                .with_opt("ReferenciaCatastral", reference)
        }
        None => Node::new(),
    };
    Node::new().with("DetalleInmueble", detail)
}
