use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{session::SessionProvider, Error, Result};

/// Contact data of the user owning a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContact {
    pub user_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UserContact {
    /// Contact with only the mandatory fields set.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> UserContact {
        UserContact {
            user_id: user_id.into(),
            username: username.into(),
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
        }
    }
}

/// Billing period requested when creating a contract. Dates are assigned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriodCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_days: Option<u32>,
}

/// Service name to add-on name to quantity.
pub type SubscriptionAddOns = HashMap<String, HashMap<String, u32>>;

/// Contract registration payload for `POST /contracts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractToCreate {
    pub user_contact: UserContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriodCreate>,
    /// Service name to pricing version.
    pub contracted_services: HashMap<String, String>,
    /// Service name to plan name.
    pub subscription_plans: HashMap<String, String>,
    #[serde(default)]
    pub subscription_add_ons: SubscriptionAddOns,
}

impl ContractToCreate {
    /// Check that every service referenced by plans and add-ons is contracted.
    pub fn validate(&self) -> Result<()> {
        check_contracted(
            &self.contracted_services,
            &self.subscription_plans,
            &self.subscription_add_ons,
        )
    }
}

/// The contracted services, plans and add-ons of a user. Body of `PUT /contracts/{userId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub contracted_services: HashMap<String, String>,
    pub subscription_plans: HashMap<String, String>,
    #[serde(default)]
    pub subscription_add_ons: SubscriptionAddOns,
}

impl Subscription {
    /// Check that every service referenced by plans and add-ons is contracted.
    pub fn validate(&self) -> Result<()> {
        check_contracted(
            &self.contracted_services,
            &self.subscription_plans,
            &self.subscription_add_ons,
        )
    }
}

fn check_contracted(
    contracted_services: &HashMap<String, String>,
    subscription_plans: &HashMap<String, String>,
    subscription_add_ons: &SubscriptionAddOns,
) -> Result<()> {
    let missing = subscription_plans
        .keys()
        .chain(subscription_add_ons.keys())
        .find(|service| !contracted_services.contains_key(*service));

    match missing {
        Some(service) => Err(Error::invalid_argument(format!(
            "Service '{service}' is referenced by the subscription but not contracted"
        ))),
        None => Ok(()),
    }
}

/// Billing period of a stored contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
    pub renewal_days: u32,
}

/// Consumption of a single usage limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLevel {
    pub consumed: f64,
    #[serde(
        default,
        rename = "resetTimeStamp",
        alias = "resetTimestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub reset_timestamp: Option<DateTime<Utc>>,
}

/// A past snapshot of a contract's subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractHistoryEntry {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub contracted_services: HashMap<String, String>,
    pub subscription_plans: HashMap<String, String>,
    #[serde(default)]
    pub subscription_add_ons: SubscriptionAddOns,
}

/// A contract as stored by SPACE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub user_contact: UserContact,
    pub billing_period: BillingPeriod,
    /// Service name to usage limit name to consumption.
    #[serde(default)]
    pub usage_levels: HashMap<String, HashMap<String, UsageLevel>>,
    pub contracted_services: HashMap<String, String>,
    pub subscription_plans: HashMap<String, String>,
    #[serde(default)]
    pub subscription_add_ons: SubscriptionAddOns,
    #[serde(default)]
    pub history: Vec<ContractHistoryEntry>,
}

impl Contract {
    /// Current subscription of the contract.
    pub fn subscription(&self) -> Subscription {
        Subscription {
            contracted_services: self.contracted_services.clone(),
            subscription_plans: self.subscription_plans.clone(),
            subscription_add_ons: self.subscription_add_ons.clone(),
        }
    }
}

/// Operations over user contracts.
pub struct ContractModule {
    sessions: Arc<dyn SessionProvider>,
}

impl ContractModule {
    /// Create a module issuing requests through `sessions`.
    pub fn new(sessions: Arc<dyn SessionProvider>) -> ContractModule {
        ContractModule { sessions }
    }

    /// Fetch the contract of `user_id` with `GET /contracts/{userId}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] with status 404 if the user has no contract. See
    /// [`ContractModule::find_contract`] for a variant that maps 404 to `None`.
    pub async fn get_contracts(&self, user_id: &str) -> Result<Contract> {
        let session = self.sessions.session()?;
        log::debug!(target: "space", user_id; "fetching contract");

        session
            .send_json(session.request(Method::GET, &["contracts", user_id])?)
            .await
            .inspect_err(|err| {
                log::warn!(target: "space", user_id; "error fetching contract: {}", err);
            })
    }

    /// Like [`ContractModule::get_contracts`] but returns `Ok(None)` when the user has no
    /// contract.
    pub async fn find_contract(&self, user_id: &str) -> Result<Option<Contract>> {
        match self.get_contracts(user_id).await {
            Ok(contract) => Ok(Some(contract)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Register a new contract with `POST /contracts`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] without sending a request if plans or add-ons reference
    /// a service that is not contracted. Returns [`Error::Remote`] with the server's error body if
    /// SPACE rejects the contract, e.g. because a service or plan does not exist.
    pub async fn add_contract(&self, contract: &ContractToCreate) -> Result<Contract> {
        contract.validate()?;

        let session = self.sessions.session()?;
        let user_id = contract.user_contact.user_id.as_str();
        log::debug!(target: "space", user_id; "creating contract");

        session
            .send_json(session.request(Method::POST, &["contracts"])?.json(contract))
            .await
            .inspect(|_| log::debug!(target: "space", user_id; "contract created"))
            .inspect_err(|err| {
                log::warn!(target: "space", user_id; "error creating contract: {}", err);
            })
    }

    /// Replace the subscription of `user_id` with `PUT /contracts/{userId}` and return the
    /// updated contract.
    pub async fn update_contract_subscription(
        &self,
        user_id: &str,
        subscription: &Subscription,
    ) -> Result<Contract> {
        subscription.validate()?;

        let session = self.sessions.session()?;
        log::debug!(target: "space", user_id; "updating contract subscription");

        session
            .send_json(
                session
                    .request(Method::PUT, &["contracts", user_id])?
                    .json(subscription),
            )
            .await
            .inspect_err(|err| {
                log::warn!(target: "space", user_id; "error updating contract subscription: {}", err);
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Contract, ContractToCreate, Subscription, UsageLevel, UserContact};
    use crate::Error;

    fn contract_to_create() -> ContractToCreate {
        ContractToCreate {
            user_contact: UserContact::new("user-1", "alice"),
            billing_period: None,
            contracted_services: [("zoom".to_owned(), "1.0.0".to_owned())].into(),
            subscription_plans: [("zoom".to_owned(), "BASIC".to_owned())].into(),
            subscription_add_ons: HashMap::new(),
        }
    }

    #[test]
    fn accepts_plans_of_contracted_services() {
        contract_to_create().validate().unwrap();
    }

    #[test]
    fn rejects_plan_of_uncontracted_service() {
        let mut contract = contract_to_create();
        contract
            .subscription_plans
            .insert("slack".to_owned(), "PRO".to_owned());

        assert!(matches!(contract.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_add_on_of_uncontracted_service() {
        let subscription = Subscription {
            contracted_services: [("zoom".to_owned(), "1.0.0".to_owned())].into(),
            subscription_plans: HashMap::new(),
            subscription_add_ons: [(
                "slack".to_owned(),
                [("extraSeats".to_owned(), 2)].into(),
            )]
            .into(),
        };

        assert!(matches!(
            subscription.validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn serializes_in_camel_case_without_empty_contact_fields() {
        let value = serde_json::to_value(contract_to_create()).unwrap();

        assert_eq!(value["userContact"]["userId"], "user-1");
        assert!(value["userContact"].get("email").is_none());
        assert!(value.get("billingPeriod").is_none());
        assert_eq!(value["subscriptionPlans"]["zoom"], "BASIC");
        assert!(value["subscriptionAddOns"].as_object().unwrap().is_empty());
    }

    #[test]
    fn parses_stored_contract() {
        let contract: Contract = serde_json::from_str(
            r#"
              {
                "userContact": {"userId": "user-1", "username": "alice", "email": "a@b.c"},
                "billingPeriod": {
                  "startDate": "2025-01-01T00:00:00.000Z",
                  "endDate": "2025-01-31T00:00:00.000Z",
                  "autoRenew": true,
                  "renewalDays": 30
                },
                "usageLevels": {
                  "zoom": {
                    "maxMeetings": {"consumed": 3, "resetTimeStamp": "2025-02-01T00:00:00Z"}
                  }
                },
                "contractedServices": {"zoom": "1.0.0"},
                "subscriptionPlans": {"zoom": "BASIC"},
                "subscriptionAddOns": {"zoom": {"extraSeats": 2}},
                "history": []
              }
            "#,
        )
        .unwrap();

        assert_eq!(contract.user_contact.email.as_deref(), Some("a@b.c"));
        assert!(contract.billing_period.auto_renew);
        let usage = &contract.usage_levels["zoom"]["maxMeetings"];
        assert_eq!(usage.consumed, 3.0);
        assert!(usage.reset_timestamp.is_some());
        assert_eq!(contract.subscription().subscription_add_ons["zoom"]["extraSeats"], 2);

        let value = serde_json::to_value(&contract).unwrap();
        let usage = &value["usageLevels"]["zoom"]["maxMeetings"];
        assert!(usage.get("resetTimeStamp").is_some());
        assert!(usage.get("resetTimestamp").is_none());
    }

    #[test]
    fn accepts_camel_case_reset_timestamp() {
        let usage: UsageLevel =
            serde_json::from_str(r#"{"consumed": 1, "resetTimestamp": "2025-02-01T00:00:00Z"}"#)
                .unwrap();
        assert!(usage.reset_timestamp.is_some());
    }
}
