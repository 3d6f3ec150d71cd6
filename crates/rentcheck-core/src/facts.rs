//! Canonical fact set extracted from one document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evidence::{EvidencedField, Source};

/// Numeric evidenced fields of an [`ExtractedFacts`].
///
/// Amounts are yen; `*_months` fields are multiples of monthly rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactField {
    Rent,
    ManagementFee,
    DepositMonths,
    KeyMoneyMonths,
    BrokerageFee,
    BrokerageMonths,
    GuaranteeFee,
    FireInsurance,
    SupportServiceFee,
    KeyExchangeFee,
    CleaningFee,
    FreeRentMonths,
    TotalAmount,
}

impl FactField {
    pub const ALL: [FactField; 13] = [
        Self::Rent,
        Self::ManagementFee,
        Self::DepositMonths,
        Self::KeyMoneyMonths,
        Self::BrokerageFee,
        Self::BrokerageMonths,
        Self::GuaranteeFee,
        Self::FireInsurance,
        Self::SupportServiceFee,
        Self::KeyExchangeFee,
        Self::CleaningFee,
        Self::FreeRentMonths,
        Self::TotalAmount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::ManagementFee => "management_fee",
            Self::DepositMonths => "deposit_months",
            Self::KeyMoneyMonths => "key_money_months",
            Self::BrokerageFee => "brokerage_fee",
            Self::BrokerageMonths => "brokerage_months",
            Self::GuaranteeFee => "guarantee_fee",
            Self::FireInsurance => "fire_insurance",
            Self::SupportServiceFee => "support_service_fee",
            Self::KeyExchangeFee => "key_exchange_fee",
            Self::CleaningFee => "cleaning_fee",
            Self::FreeRentMonths => "free_rent_months",
            Self::TotalAmount => "total_amount",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rent => "Rent",
            Self::ManagementFee => "Management fee",
            Self::DepositMonths => "Deposit",
            Self::KeyMoneyMonths => "Key money",
            Self::BrokerageFee | Self::BrokerageMonths => "Brokerage fee",
            Self::GuaranteeFee => "Guarantee fee",
            Self::FireInsurance => "Fire insurance",
            Self::SupportServiceFee => "Support service",
            Self::KeyExchangeFee => "Key exchange",
            Self::CleaningFee => "Cleaning fee",
            Self::FreeRentMonths => "Free rent",
            Self::TotalAmount => "Total",
        }
    }

    /// Short description used in prompts.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Rent => "monthly rent in yen (賃料/家賃)",
            Self::ManagementFee => "monthly management / common-area fee in yen (管理費/共益費)",
            Self::DepositMonths => "security deposit in months of rent (敷金)",
            Self::KeyMoneyMonths => "key money in months of rent (礼金)",
            Self::BrokerageFee => "brokerage fee in yen, tax included (仲介手数料)",
            Self::BrokerageMonths => "brokerage fee in months of rent (仲介手数料 Nヶ月)",
            Self::GuaranteeFee => "rent guarantee company fee in yen (保証料)",
            Self::FireInsurance => "fire / renter's insurance in yen (火災保険)",
            Self::SupportServiceFee => {
                "24-hour support / concierge / 安心サポート service fee in yen"
            }
            Self::KeyExchangeFee => "key / lock exchange fee in yen (鍵交換)",
            Self::CleaningFee => "move-out or room cleaning fee in yen (クリーニング/清掃)",
            Self::FreeRentMonths => "free-rent period in months (フリーレント)",
            Self::TotalAmount => "grand total of the document in yen (合計)",
        }
    }

    /// Whether the value is a count of months (as opposed to a yen amount).
    pub fn is_months(&self) -> bool {
        matches!(
            self,
            Self::DepositMonths | Self::KeyMoneyMonths | Self::BrokerageMonths | Self::FreeRentMonths
        )
    }
}

impl fmt::Display for FactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown fact field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for FactField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A free-form billed or listed line item that has no dedicated field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherItem {
    pub name: String,
    pub field: EvidencedField<f64>,
}

/// Everything read from one document. Created per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub source: Source,
    pub property_name: EvidencedField<String>,
    pub room_number: EvidencedField<String>,
    pub move_in_date: EvidencedField<String>,
    pub contract_start_date: EvidencedField<String>,
    pub rent: EvidencedField<f64>,
    pub management_fee: EvidencedField<f64>,
    pub deposit_months: EvidencedField<f64>,
    pub key_money_months: EvidencedField<f64>,
    pub brokerage_fee: EvidencedField<f64>,
    pub brokerage_months: EvidencedField<f64>,
    pub guarantee_fee: EvidencedField<f64>,
    pub fire_insurance: EvidencedField<f64>,
    pub support_service_fee: EvidencedField<f64>,
    pub key_exchange_fee: EvidencedField<f64>,
    pub cleaning_fee: EvidencedField<f64>,
    pub free_rent_months: EvidencedField<f64>,
    pub total_amount: EvidencedField<f64>,
    #[serde(default)]
    pub other_items: Vec<OtherItem>,
    /// Number of line items the extractor reported seeing.
    #[serde(default)]
    pub total_items: u32,
}

impl ExtractedFacts {
    /// An all-null fact set. This is the degrade path for a failed extraction.
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            property_name: EvidencedField::missing(source),
            room_number: EvidencedField::missing(source),
            move_in_date: EvidencedField::missing(source),
            contract_start_date: EvidencedField::missing(source),
            rent: EvidencedField::missing(source),
            management_fee: EvidencedField::missing(source),
            deposit_months: EvidencedField::missing(source),
            key_money_months: EvidencedField::missing(source),
            brokerage_fee: EvidencedField::missing(source),
            brokerage_months: EvidencedField::missing(source),
            guarantee_fee: EvidencedField::missing(source),
            fire_insurance: EvidencedField::missing(source),
            support_service_fee: EvidencedField::missing(source),
            key_exchange_fee: EvidencedField::missing(source),
            cleaning_fee: EvidencedField::missing(source),
            free_rent_months: EvidencedField::missing(source),
            total_amount: EvidencedField::missing(source),
            other_items: Vec::new(),
            total_items: 0,
        }
    }

    pub fn field(&self, field: FactField) -> &EvidencedField<f64> {
        match field {
            FactField::Rent => &self.rent,
            FactField::ManagementFee => &self.management_fee,
            FactField::DepositMonths => &self.deposit_months,
            FactField::KeyMoneyMonths => &self.key_money_months,
            FactField::BrokerageFee => &self.brokerage_fee,
            FactField::BrokerageMonths => &self.brokerage_months,
            FactField::GuaranteeFee => &self.guarantee_fee,
            FactField::FireInsurance => &self.fire_insurance,
            FactField::SupportServiceFee => &self.support_service_fee,
            FactField::KeyExchangeFee => &self.key_exchange_fee,
            FactField::CleaningFee => &self.cleaning_fee,
            FactField::FreeRentMonths => &self.free_rent_months,
            FactField::TotalAmount => &self.total_amount,
        }
    }

    pub fn field_mut(&mut self, field: FactField) -> &mut EvidencedField<f64> {
        match field {
            FactField::Rent => &mut self.rent,
            FactField::ManagementFee => &mut self.management_fee,
            FactField::DepositMonths => &mut self.deposit_months,
            FactField::KeyMoneyMonths => &mut self.key_money_months,
            FactField::BrokerageFee => &mut self.brokerage_fee,
            FactField::BrokerageMonths => &mut self.brokerage_months,
            FactField::GuaranteeFee => &mut self.guarantee_fee,
            FactField::FireInsurance => &mut self.fire_insurance,
            FactField::SupportServiceFee => &mut self.support_service_fee,
            FactField::KeyExchangeFee => &mut self.key_exchange_fee,
            FactField::CleaningFee => &mut self.cleaning_fee,
            FactField::FreeRentMonths => &mut self.free_rent_months,
            FactField::TotalAmount => &mut self.total_amount,
        }
    }

    /// Replace one numeric field.
    pub fn set(&mut self, field: FactField, value: EvidencedField<f64>) {
        *self.field_mut(field) = value;
    }

    /// Text fields, paired with their names.
    pub fn text_fields(&self) -> [(&'static str, &EvidencedField<String>); 4] {
        [
            ("property_name", &self.property_name),
            ("room_number", &self.room_number),
            ("move_in_date", &self.move_in_date),
            ("contract_start_date", &self.contract_start_date),
        ]
    }

    /// Number of numeric fields that carry a value.
    pub fn populated_count(&self) -> usize {
        FactField::ALL
            .iter()
            .filter(|f| !self.field(**f).is_null())
            .count()
    }
}
