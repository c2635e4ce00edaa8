//! Pricing catalog models: services, pricing versions and their features, usage limits, plans
//! and add-ons.
use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{features::LimitValue, Error};

/// A service and all of its pricing versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    /// Version to pricing, offered to new subscribers.
    #[serde(default)]
    pub active_pricings: HashMap<String, Pricing>,
    /// Version to pricing, retired.
    #[serde(default, alias = "archivedPricings")]
    pub archived_pricing: HashMap<String, Pricing>,
}

/// A versioned snapshot of a service's features, usage limits, plans and add-ons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub version: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub features: HashMap<String, PricingFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limits: Option<HashMap<String, UsageLimit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plans: Option<HashMap<String, Plan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons: Option<HashMap<String, AddOn>>,
}

/// Value of a feature: a boolean toggle, a number or a textual value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum FeatureValue {
    Boolean(bool),
    Integer(i64),
    Numeric(f64),
    Text(String),
}

/// Price of a plan or add-on: an amount or a price expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Expression(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingFeatureValueType {
    Boolean,
    Integer,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingFeatureType {
    Information,
    Integration,
    Domain,
    Automation,
    Management,
    Guarantee,
    Support,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationType {
    Api,
    Extension,
    Identity,
    WebSaas,
    Marketplace,
    ExternalDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutomationType {
    Bot,
    Filtering,
    Tracking,
    TaskAutomation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Card,
    Gateway,
    Invoice,
    Ach,
    #[serde(alias = "WIRE_TRANSFERENCIE")]
    WireTransfer,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderMode {
    Auto,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingFeature {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value_type: PricingFeatureValueType,
    pub default_value: FeatureValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FeatureValue>,
    #[serde(rename = "type")]
    pub feature_type: PricingFeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<IntegrationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_type: Option<AutomationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_expression: Option<String>,
    #[serde(default = "default_render_mode")]
    pub render_mode: RenderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

fn default_render_mode() -> RenderMode {
    RenderMode::Auto
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageLimitValueType {
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageLimitType {
    Renewable,
    NonRenewable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodUnit {
    Sec,
    Min,
    Hour,
    Day,
    Month,
    Year,
}

/// Reset period of a renewable usage limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub value: u32,
    pub unit: PeriodUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value_type: UsageLimitValueType,
    pub default_value: LimitValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LimitValue>,
    #[serde(rename = "type")]
    pub limit_type: UsageLimitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_features: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    // `features: null` is common in pricing files.
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: HashMap<String, FeatureValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limits: Option<HashMap<String, LimitValue>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_step: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_for: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, FeatureValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limits: Option<HashMap<String, LimitValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limits_extensions: Option<HashMap<String, LimitValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_constraints: Option<SubscriptionConstraint>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Whether a pricing version is offered to new subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Active,
    Archived,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Active => "ACTIVE",
            Availability::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Availability, Error> {
        match s {
            "ACTIVE" => Ok(Availability::Active),
            "ARCHIVED" => Ok(Availability::Archived),
            _ => Err(Error::invalid_argument("Invalid availability type")),
        }
    }
}

/// Plan and add-ons subscribers are migrated to when their pricing version is archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSubscription {
    pub subscription_plan: String,
    /// Add-on name to quantity.
    #[serde(default)]
    pub subscription_add_ons: HashMap<String, u32>,
}

impl FallbackSubscription {
    /// Fallback to `plan` without add-ons.
    pub fn new(plan: impl Into<String>) -> FallbackSubscription {
        FallbackSubscription {
            subscription_plan: plan.into(),
            subscription_add_ons: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Availability, FeatureValue, PaymentType, Price, RenderMode, Service};
    use crate::{features::LimitValue, Error};

    #[test]
    fn availability_is_parsed_at_the_boundary() {
        assert_eq!("ACTIVE".parse::<Availability>().unwrap(), Availability::Active);
        assert_eq!(
            "ARCHIVED".parse::<Availability>().unwrap(),
            Availability::Archived
        );
        assert!(matches!(
            "DELETED".parse::<Availability>(),
            Err(Error::InvalidArgument(message)) if message == "Invalid availability type"
        ));
        assert_eq!(Availability::Archived.to_string(), "ARCHIVED");
    }

    #[test]
    fn parses_service_with_pricing() {
        let service: Service = serde_json::from_str(
            r#"
              {
                "name": "zoom",
                "activePricings": {
                  "1.0.0": {
                    "version": "1.0.0",
                    "currency": "USD",
                    "createdAt": "2025-01-01T00:00:00.000Z",
                    "features": {
                      "meetings": {
                        "name": "meetings",
                        "valueType": "BOOLEAN",
                        "defaultValue": true,
                        "type": "DOMAIN",
                        "renderMode": "ENABLED"
                      },
                      "wire": {
                        "name": "wire",
                        "valueType": "STRING",
                        "defaultValue": "none",
                        "type": "PAYMENT",
                        "paymentType": "WIRE_TRANSFERENCIE"
                      }
                    },
                    "usageLimits": {
                      "maxMeetings": {
                        "name": "maxMeetings",
                        "valueType": "INTEGER",
                        "defaultValue": 5,
                        "type": "RENEWABLE",
                        "period": {"value": 1, "unit": "MONTH"},
                        "linkedFeatures": ["meetings"]
                      }
                    },
                    "plans": {
                      "BASIC": {"price": 0.0, "features": null},
                      "PRO": {"price": "10 * users", "features": {"meetings": true}}
                    },
                    "addons": null
                  }
                },
                "archivedPricings": {}
              }
            "#,
        )
        .unwrap();

        let pricing = &service.active_pricings["1.0.0"];
        let meetings = &pricing.features["meetings"];
        assert_eq!(meetings.default_value, FeatureValue::Boolean(true));
        assert_eq!(meetings.render_mode, RenderMode::Enabled);
        assert_eq!(
            pricing.features["wire"].payment_type,
            Some(PaymentType::WireTransfer)
        );
        assert_eq!(pricing.features["wire"].render_mode, RenderMode::Auto);

        let limit = &pricing.usage_limits.as_ref().unwrap()["maxMeetings"];
        assert_eq!(limit.default_value, LimitValue::Integer(5));

        let plans = pricing.plans.as_ref().unwrap();
        assert!(plans["BASIC"].features.is_empty());
        assert_eq!(plans["BASIC"].price, Price::Amount(0.0));
        assert_eq!(plans["PRO"].price, Price::Expression("10 * users".to_owned()));
        assert!(pricing.addons.is_none());
        assert!(service.archived_pricing.is_empty());
    }
}
