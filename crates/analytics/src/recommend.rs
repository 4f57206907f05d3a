use crate::present::Presenter;
use core_types::{Customer, MlPrediction, Order, Reward, RewardRecommendation, Tier};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

const NO_REWARD: &str = "None";
const NO_REASON: &str = "No reason provided";
const UNKNOWN_NAME: &str = "Unknown";

/// One row of the reward recommendation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub customer: Uuid,
    pub name: String,
    pub tier: Tier,
    /// Lifetime spend, formatted as money.
    pub clv: String,
    pub predicted_clv: String,
    pub recommended_reward: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RecommendationInputs<'a> {
    pub customers: &'a [Customer],
    pub orders: &'a [Order],
    pub predictions: &'a [MlPrediction],
    pub links: &'a [RewardRecommendation],
    pub rewards: &'a [Reward],
}

/// The most recent prediction of every customer. On equal dates the first
/// prediction seen wins.
pub fn latest_predictions(predictions: &[MlPrediction]) -> HashMap<Uuid, &MlPrediction> {
    let mut latest: HashMap<Uuid, &MlPrediction> = HashMap::new();
    for p in predictions {
        latest
            .entry(p.customer_id)
            .and_modify(|current| {
                if p.prediction_date > current.prediction_date {
                    *current = p;
                }
            })
            .or_insert(p);
    }
    latest
}

/// One recommendation per customer, in customer order.
pub fn build_recommendations(presenter: &Presenter, inputs: RecommendationInputs<'_>) -> Vec<Recommendation> {
    let mut spend: HashMap<Uuid, Decimal> = HashMap::new();
    for order in inputs.orders {
        *spend.entry(order.customer_id).or_default() += order.total;
    }

    let latest = latest_predictions(inputs.predictions);
    let reward_names: HashMap<Uuid, &str> = inputs.rewards.iter().map(|r| (r.id, r.name.as_str())).collect();
    let links: HashMap<Uuid, &RewardRecommendation> =
        inputs.links.iter().map(|l| (l.ml_prediction_id, l)).collect();

    inputs
        .customers
        .iter()
        .map(|customer| {
            let prediction = latest.get(&customer.id);
            let link = prediction.and_then(|p| links.get(&p.id));

            let recommended_reward = link
                .and_then(|l| reward_names.get(&l.reward_id))
                .map_or(NO_REWARD, |name| *name)
                .to_string();
            let reason = link
                .and_then(|l| l.reason.clone())
                .unwrap_or_else(|| NO_REASON.to_string());

            Recommendation {
                customer: customer.id,
                name: customer.name.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                tier: customer.tier,
                clv: presenter.format_money(spend.get(&customer.id).copied().unwrap_or_default()),
                predicted_clv: presenter.format_money(prediction.map_or(Decimal::ZERO, |p| p.clv_predicted)),
                recommended_reward,
                reason,
            }
        })
        .collect()
}
