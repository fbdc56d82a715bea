//! Member business category.
//!
//! Intake forms have historically sent many spellings for the same category
//! ("Manufacturer", "manufacturing", "mfg"). They are resolved once here, at
//! the boundary, into a closed set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Business category a member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Manufacturer,
    Trader,
    Retailer,
    ServiceProvider,
    Professional,
    Other,
}

impl BusinessType {
    /// Human-readable label used on passes and captions.
    pub fn display_name(&self) -> &'static str {
        match self {
            BusinessType::Manufacturer => "Manufacturer",
            BusinessType::Trader => "Trader",
            BusinessType::Retailer => "Retailer",
            BusinessType::ServiceProvider => "Service Provider",
            BusinessType::Professional => "Professional",
            BusinessType::Other => "Other",
        }
    }

    /// Canonical storage value.
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Manufacturer => "manufacturer",
            BusinessType::Trader => "trader",
            BusinessType::Retailer => "retailer",
            BusinessType::ServiceProvider => "service_provider",
            BusinessType::Professional => "professional",
            BusinessType::Other => "other",
        }
    }

    fn resolve_alias(normalized: &str) -> Option<Self> {
        let resolved = match normalized {
            "manufacturer" | "manufacturers" | "manufacturing" | "mfg" | "industry"
            | "industrial" => BusinessType::Manufacturer,
            "trader" | "traders" | "trading" | "trade" | "wholesale" | "wholesaler"
            | "distributor" => BusinessType::Trader,
            "retailer" | "retailers" | "retail" | "shop" | "shopkeeper" => BusinessType::Retailer,
            "service provider" | "service providers" | "service" | "services" => {
                BusinessType::ServiceProvider
            }
            "professional" | "professionals" | "consultant" | "consultancy" => {
                BusinessType::Professional
            }
            "other" | "others" => BusinessType::Other,
            _ => return None,
        };
        Some(resolved)
    }
}

impl FromStr for BusinessType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if normalized.is_empty() {
            return Err(ValidationError::empty_field("business_type"));
        }

        Self::resolve_alias(&normalized).ok_or_else(|| {
            ValidationError::invalid_format("business_type", format!("unknown category '{}'", s))
        })
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
