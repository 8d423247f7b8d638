// protocol/role.rs - Role configuration

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::message::{Role, Terms};
use crate::quantity::{Bound, Quantity, QuantityKind};

/// A role's private limit pair: ceiling for the client, floor for the developer.
/// Fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorLimits {
    pub budget: String,
    pub time: String,
}

impl ActorLimits {
    pub fn new(budget: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            budget: budget.into(),
            time: time.into(),
        }
    }
}

/// Everything that distinguishes the client from the developer
#[derive(Debug, Clone, PartialEq)]
pub struct RoleProfile {
    pub role: Role,
    pub limits: ActorLimits,

    /// Opening budget as a share of the limit budget
    pub opening_budget: RangeInclusive<f64>,

    /// Opening time as a share of the limit time
    pub opening_time: f64,
}

impl RoleProfile {
    /// Client: opens at 50-60% of its ceiling budget with a shorter timeline
    pub fn client(limits: ActorLimits) -> Self {
        Self {
            role: Role::Client,
            limits,
            opening_budget: 0.5..=0.6,
            opening_time: 0.75,
        }
    }

    /// Developer: opens at 150-200% of its floor budget with a longer timeline
    pub fn developer(limits: ActorLimits) -> Self {
        Self {
            role: Role::Developer,
            limits,
            opening_budget: 1.5..=2.0,
            opening_time: 1.5,
        }
    }

    pub fn for_role(role: Role, limits: ActorLimits) -> Self {
        match role {
            Role::Client => Self::client(limits),
            Role::Developer => Self::developer(limits),
        }
    }

    pub fn bound(&self) -> Bound {
        match self.role {
            Role::Client => Bound::Ceiling,
            Role::Developer => Bound::Floor,
        }
    }

    /// Human-readable percentage range of the opening budget, e.g. "50-60%"
    pub fn opening_budget_label(&self) -> String {
        format!(
            "{:.0}-{:.0}%",
            self.opening_budget.start() * 100.0,
            self.opening_budget.end() * 100.0
        )
    }

    /// Opening terms for a given budget share.
    ///
    /// Limits that do not parse are passed through unchanged.
    pub fn anchor(&self, budget_share: f64) -> Terms {
        let budget = match self.limits.budget.parse::<Quantity>() {
            Ok(q) => q.scaled(budget_share).rounded().to_string(),
            Err(_) => self.limits.budget.clone(),
        };

        let time = match self.limits.time.parse::<Quantity>() {
            Ok(q) => {
                let (days, unit) = q.normalized(QuantityKind::Time);
                if unit == "day" {
                    Quantity::new(days * self.opening_time, "days").rounded().to_string()
                } else {
                    q.scaled(self.opening_time).rounded().to_string()
                }
            }
            Err(_) => self.limits.time.clone(),
        };

        Terms::new(time, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_mirror_each_other() {
        let client = RoleProfile::client(ActorLimits::new("1500 eur", "1 mes"));
        let developer = RoleProfile::developer(ActorLimits::new("1200 eur", "3 weeks"));

        assert_eq!(client.bound(), Bound::Ceiling);
        assert_eq!(developer.bound(), Bound::Floor);
        assert_eq!(client.opening_budget_label(), "50-60%");
        assert_eq!(developer.opening_budget_label(), "150-200%");
    }

    #[test]
    fn test_anchor_scales_limits() {
        let developer = RoleProfile::developer(ActorLimits::new("1200 eur", "3 weeks"));
        let anchor = developer.anchor(1.75);
        assert_eq!(anchor.budget, "2100 eur");
        // 21 days * 1.5, rounded
        assert_eq!(anchor.time, "32 days");

        let client = RoleProfile::client(ActorLimits::new("1500 eur", "1 mes"));
        let anchor = client.anchor(0.6);
        assert_eq!(anchor.budget, "900 eur");
        assert_eq!(anchor.time, "23 days");
    }

    #[test]
    fn test_anchor_keeps_unparseable_limits() {
        let client = RoleProfile::client(ActorLimits::new("negotiable", "asap"));
        let anchor = client.anchor(0.5);
        assert_eq!(anchor, Terms::new("asap", "negotiable"));
    }
}
