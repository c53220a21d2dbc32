//! Per-regime configuration: general VAT (IVA) vs Canary Islands IGIC.
//!
//! Everything here is a pure lookup over static tables. The two regimes
//! differ only in data, so a single [`VariantPolicy`] parameterized by
//! [`Variant`] covers both.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::core::RectificationKind;

/// Regime code used when the invoice carries none or an unknown one.
pub const DEFAULT_REGIME_CODE: &str = "01";
/// Export of goods (issued invoices).
pub const EXPORT_REGIME_CODE: &str = "02";
/// Import not linked to a customs declaration (received invoices).
pub const IMPORT_REGIME_CODE: &str = "13";
/// Business premises lease subject to withholding.
pub const LEASE_WITH_RETENTION: &str = "11";
/// Business premises lease not subject to withholding.
pub const LEASE_WITHOUT_RETENTION: &str = "12";

/// Tax regime a declaration is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Impuesto sobre el Valor Añadido (peninsula and Balearic Islands).
    General,
    /// Impuesto General Indirecto Canario.
    Regional,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Regional => "regional",
        }
    }
}

/// A rate and the inclusive window in which it may be declared.
/// Bounds are `(year, month, day)`; `None` means unbounded.
struct RateWindow {
    rate: Decimal,
    from: Option<(i32, u32, u32)>,
    until: Option<(i32, u32, u32)>,
}

impl RateWindow {
    const fn always(rate: Decimal) -> Self {
        Self {
            rate,
            from: None,
            until: None,
        }
    }

    const fn since(rate: Decimal, from: (i32, u32, u32)) -> Self {
        Self {
            rate,
            from: Some(from),
            until: None,
        }
    }

    const fn between(rate: Decimal, from: (i32, u32, u32), until: (i32, u32, u32)) -> Self {
        Self {
            rate,
            from: Some(from),
            until: Some(until),
        }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        let day = (date.year(), date.month(), date.day());
        self.from.is_none_or(|from| day >= from) && self.until.is_none_or(|until| day <= until)
    }
}

static GENERAL_RATES: &[RateWindow] = &[
    RateWindow::always(dec!(0)),
    RateWindow::always(dec!(4)),
    RateWindow::always(dec!(10)),
    RateWindow::always(dec!(21)),
    // Temporary reductions on energy and staple food.
    RateWindow::between(dec!(5), (2021, 6, 26), (2024, 12, 31)),
    RateWindow::between(dec!(2), (2024, 1, 1), (2024, 9, 30)),
];

static REGIONAL_RATES: &[RateWindow] = &[
    RateWindow::always(dec!(0)),
    RateWindow::always(dec!(3)),
    RateWindow::always(dec!(5)),
    RateWindow::always(dec!(7)),
    RateWindow::always(dec!(9.5)),
    RateWindow::always(dec!(20)),
    RateWindow::between(dec!(13.5), (2012, 7, 1), (2019, 12, 31)),
    RateWindow::since(dec!(6.5), (2019, 1, 1)),
    RateWindow::since(dec!(15), (2020, 1, 1)),
];

/// ClaveRegimenEspecialOTrascendencia codes shared by both regimes.
static REGIME_CODES: &[(&str, &str)] = &[
    ("01", "Operación de régimen general"),
    ("02", "Exportación"),
    (
        "03",
        "Régimen especial de bienes usados, objetos de arte, antigüedades y objetos de colección",
    ),
    ("04", "Régimen especial del oro de inversión"),
    ("05", "Régimen especial de las agencias de viajes"),
    ("06", "Régimen especial grupo de entidades"),
    ("07", "Régimen especial del criterio de caja"),
    ("08", "Operaciones sujetas a otro impuesto indirecto territorial"),
    ("09", "Prestaciones de servicios de agencias de viaje como mediadoras"),
    ("10", "Cobros por cuenta de terceros"),
    ("11", "Arrendamiento de local de negocio sujeto a retención"),
    ("12", "Arrendamiento de local de negocio no sujeto a retención"),
    ("13", "Arrendamiento sujeto y no sujeto a retención / importación sin DUA"),
    ("14", "Impuesto pendiente de devengo en certificaciones de obra"),
    ("15", "Impuesto pendiente de devengo en operaciones de tracto sucesivo"),
];

/// Codes only known to the general regime.
static GENERAL_ONLY_REGIME_CODES: &[(&str, &str)] = &[
    ("16", "Primer semestre 2017 y otras facturas anteriores"),
    ("17", "Operación acogida a regímenes de ventanilla única (OSS/IOSS)"),
];

/// Sign applied to amounts per rectification kind.
static SIGN_TABLE: &[(RectificationKind, i8)] = &[
    (RectificationKind::Normal, 1),
    (RectificationKind::Difference, 1),
    (RectificationKind::Credit, -1),
    (RectificationKind::Substitution, 1),
    (RectificationKind::SubstitutionCredit, -1),
];

const EXEMPT_KEYWORDS: &[&str] = &["exento", "exenta", "exempt"];

/// Static per-regime configuration used by every stage of the engine.
///
/// ```
/// use suministro::sii::{Variant, VariantPolicy};
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let policy = VariantPolicy::for_variant(Variant::Regional);
/// let date = NaiveDate::from_ymd_opt(2016, 12, 31).unwrap();
/// assert!(policy.is_valid_rate(dec!(13.5), date));
/// assert_eq!(policy.breakdown_container(), "DesgloseIGIC");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPolicy {
    variant: Variant,
    exempt_requires_keyword: bool,
    rounding_dp: u32,
}

impl VariantPolicy {
    /// Select the policy for a regime.
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::General => Self::general(),
            Variant::Regional => Self::regional(),
        }
    }

    /// General VAT regime.
    pub fn general() -> Self {
        Self {
            variant: Variant::General,
            exempt_requires_keyword: false,
            rounding_dp: 2,
        }
    }

    /// Canary Islands IGIC regime.
    pub fn regional() -> Self {
        Self {
            variant: Variant::Regional,
            exempt_requires_keyword: true,
            rounding_dp: 2,
        }
    }

    /// Require an exemption keyword in the tax name before a zero-rate line
    /// counts as exempt.
    pub fn with_exempt_keyword_required(mut self, required: bool) -> Self {
        self.exempt_requires_keyword = required;
        self
    }

    /// Decimal places used to round the non-subject remainder.
    pub fn with_rounding_dp(mut self, dp: u32) -> Self {
        self.rounding_dp = dp;
        self
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn exempt_requires_keyword(&self) -> bool {
        self.exempt_requires_keyword
    }

    pub fn rounding_dp(&self) -> u32 {
        self.rounding_dp
    }

    /// Whether a tax name belongs to this regime's tax family.
    pub fn matches_tax_family(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        match self.variant {
            Variant::General => upper.contains("IVA"),
            Variant::Regional => upper.contains("IGIC"),
        }
    }

    /// Whether a tax name carries an exemption keyword.
    pub fn has_exempt_keyword(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        EXEMPT_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
    }

    fn rate_table(&self) -> &'static [RateWindow] {
        match self.variant {
            Variant::General => GENERAL_RATES,
            Variant::Regional => REGIONAL_RATES,
        }
    }

    /// Rates that may be declared for an operation on `date`.
    pub fn valid_rates(&self, date: NaiveDate) -> BTreeSet<Decimal> {
        self.rate_table()
            .iter()
            .filter(|window| window.contains(date))
            .map(|window| window.rate.normalize())
            .collect()
    }

    pub fn is_valid_rate(&self, rate: Decimal, date: NaiveDate) -> bool {
        self.valid_rates(date).contains(&rate.normalize())
    }

    /// Regime codes known to this variant, in table order.
    pub fn regime_codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = REGIME_CODES.iter().map(|(code, _)| *code).collect();
        if self.variant == Variant::General {
            codes.extend(GENERAL_ONLY_REGIME_CODES.iter().map(|(code, _)| *code));
        }
        codes
    }

    /// Description of a regime code, if known to this variant.
    pub fn regime_description(&self, code: &str) -> Option<&'static str> {
        let general_only: &[(&str, &str)] = match self.variant {
            Variant::General => GENERAL_ONLY_REGIME_CODES,
            Variant::Regional => &[],
        };
        REGIME_CODES
            .iter()
            .chain(general_only)
            .find(|(known, _)| *known == code)
            .map(|(_, description)| *description)
    }

    /// Map a raw regime code to the declared one.
    ///
    /// Single digits are zero-padded ("1" → "01"); absent or unknown codes
    /// fall back to [`DEFAULT_REGIME_CODE`].
    pub fn regime_code(&self, raw: Option<&str>) -> &'static str {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return DEFAULT_REGIME_CODE;
        };
        let normalized = if raw.len() == 1 && raw.chars().all(|c| c.is_ascii_digit()) {
            format!("0{raw}")
        } else {
            raw.to_string()
        };
        self.regime_codes()
            .into_iter()
            .find(|code| *code == normalized)
            .unwrap_or(DEFAULT_REGIME_CODE)
    }

    /// Declaration schema version (`IDVersionSii`).
    pub fn version(&self) -> &'static str {
        match self.variant {
            Variant::General => "1.1",
            Variant::Regional => "1.0",
        }
    }

    /// Name of the rate breakdown container.
    pub fn breakdown_container(&self) -> &'static str {
        match self.variant {
            Variant::General => "DesgloseIVA",
            Variant::Regional => "DesgloseIGIC",
        }
    }

    /// Name of a single rate entry inside the breakdown container.
    pub fn detail_entry(&self) -> &'static str {
        match self.variant {
            Variant::General => "DetalleIVA",
            Variant::Regional => "DetalleIGIC",
        }
    }

    /// Sign applied to a rectification kind's amounts.
    pub fn sign(&self, kind: RectificationKind) -> Decimal {
        SIGN_TABLE
            .iter()
            .find(|(known, _)| *known == kind)
            .map_or(Decimal::ONE, |(_, sign)| Decimal::from(*sign))
    }
}
