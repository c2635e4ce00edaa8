use std::{collections::HashMap, sync::Arc};

use derive_more::From;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{session::SessionProvider, Result};

/// Error code returned by SPACE when the evaluated feature does not exist.
pub const FLAG_NOT_FOUND: &str = "FLAG_NOT_FOUND";

/// Describes why an evaluation resolved to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureError {
    pub code: String,
    pub message: String,
}

impl FeatureError {
    /// Returns `true` if the feature is unknown to SPACE.
    pub fn is_flag_not_found(&self) -> bool {
        self.code == FLAG_NOT_FOUND
    }
}

/// Value of a usage limit or of its consumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum LimitValue {
    Integer(i64),
    Numeric(f64),
    Boolean(bool),
}

impl LimitValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LimitValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers are widened.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            LimitValue::Integer(i) => Some(*i as f64),
            LimitValue::Numeric(n) => Some(*n),
            LimitValue::Boolean(_) => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            LimitValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Outcome of a feature evaluation.
///
/// An unknown feature is not an error of the call: it resolves to `eval == false` with
/// [`FeatureError::code`] set to [`FLAG_NOT_FOUND`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEvaluationResult {
    pub eval: bool,
    /// Consumption of each usage limit linked to the feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<HashMap<String, LimitValue>>,
    /// Value of each usage limit linked to the feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<HashMap<String, LimitValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FeatureError>,
}

impl FeatureEvaluationResult {
    /// Returns `true` if the feature is unknown to SPACE.
    pub fn is_flag_not_found(&self) -> bool {
        self.error.as_ref().is_some_and(FeatureError::is_flag_not_found)
    }
}

/// Query flags of [`FeatureModule::evaluate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Ask SPACE to return `used`/`limit` details.
    pub details: bool,
    /// Evaluate the server-side expression of the feature.
    pub server: bool,
}

impl EvaluationOptions {
    pub fn with_details(mut self, details: bool) -> EvaluationOptions {
        self.details = details;
        self
    }

    pub fn with_server(mut self, server: bool) -> EvaluationOptions {
        self.server = server;
        self
    }

    fn query(&self) -> Vec<(&'static str, &'static str)> {
        let mut query = Vec::new();
        if self.details {
            query.push(("details", "true"));
        }
        if self.server {
            query.push(("server", "true"));
        }
        query
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingTokenResponse {
    #[serde(default)]
    pricing_token: Option<String>,
}

/// Feature evaluation, evaluation revert and pricing tokens.
pub struct FeatureModule {
    sessions: Arc<dyn SessionProvider>,
}

impl FeatureModule {
    /// Create a module issuing requests through `sessions`.
    pub fn new(sessions: Arc<dyn SessionProvider>) -> FeatureModule {
        FeatureModule { sessions }
    }

    /// Evaluate `feature_id` for `user_id` with `POST /features/{userId}/{featureId}`.
    ///
    /// `expected_consumption` maps usage limit names to the amount the caller is about to
    /// consume and is sent as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`](crate::Error::Remote) or
    /// [`Error::Transport`](crate::Error::Transport) if the request fails. An unknown feature is
    /// *not* an error, see [`FeatureEvaluationResult::is_flag_not_found`].
    pub async fn evaluate(
        &self,
        user_id: &str,
        feature_id: &str,
        expected_consumption: &HashMap<String, f64>,
        options: EvaluationOptions,
    ) -> Result<FeatureEvaluationResult> {
        let session = self.sessions.session()?;
        log::debug!(target: "space", user_id, feature_id; "evaluating feature");

        let request = session
            .request_with_query(Method::POST, &["features", user_id, feature_id], &options.query())?
            .json(expected_consumption);
        let response = session.execute(request).await.inspect_err(|err| {
            log::warn!(target: "space", user_id, feature_id; "error evaluating feature: {}", err);
        })?;

        if !response.status.is_success() {
            // SPACE may report resolvable conditions with an error status and an evaluation body.
            if let Ok(result @ FeatureEvaluationResult { error: Some(_), .. }) =
                serde_json::from_slice::<FeatureEvaluationResult>(&response.body)
            {
                log::debug!(target: "space", user_id, feature_id, status = response.status.as_u16(); "feature evaluated with error outcome");
                return Ok(result);
            }

            let err = response.into_remote_error();
            log::warn!(target: "space", user_id, feature_id; "error evaluating feature: {}", err);
            return Err(err);
        }

        let result: FeatureEvaluationResult = response.json()?;
        log::trace!(target: "space", user_id, feature_id, eval = result.eval; "evaluated feature");
        Ok(result)
    }

    /// Revert the latest optimistic evaluation of `feature_id` for `user_id` with
    /// `POST /features/{userId}?revert=true&latest={revertToLatest}`.
    ///
    /// Returns `Ok(false)` if there is no evaluation to revert.
    pub async fn revert_evaluation(
        &self,
        user_id: &str,
        feature_id: &str,
        revert_to_latest: bool,
    ) -> Result<bool> {
        let session = self.sessions.session()?;
        log::debug!(target: "space", user_id, feature_id; "reverting evaluation");

        let latest = if revert_to_latest { "true" } else { "false" };
        let request = session.request_with_query(
            Method::POST,
            &["features", user_id],
            &[("revert", "true"), ("latest", latest)],
        )?;
        let response = session.execute(request).await?;

        match response.status {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => {
                log::debug!(target: "space", user_id, feature_id; "no evaluation to revert");
                Ok(false)
            }
            _ => {
                let err = response.into_remote_error();
                log::warn!(target: "space", user_id, feature_id; "error reverting evaluation: {}", err);
                Err(err)
            }
        }
    }

    /// Issue a pricing token for `user_id` with `POST /features/{userId}/pricing-token`.
    ///
    /// Returns an empty string if the response carries no token.
    pub async fn generate_user_pricing_token(&self, user_id: &str) -> Result<String> {
        let session = self.sessions.session()?;
        log::debug!(target: "space", user_id; "generating pricing token");

        let response: PricingTokenResponse = session
            .send_json(session.request(Method::POST, &["features", user_id, "pricing-token"])?)
            .await
            .inspect_err(|err| {
                log::warn!(target: "space", user_id; "error generating pricing token: {}", err);
            })?;

        Ok(response.pricing_token.unwrap_or_default())
    }
}
