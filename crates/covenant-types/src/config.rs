//! Configuration for an escrow service instance.

use serde::{Deserialize, Serialize};

use crate::{CovenantError, FeeSchedule, Principal, Result};

/// Configuration for a single escrow service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Principal allowed to change the treasury and hand over ownership.
    pub owner: Principal,
    /// Receives the platform fee on every payout.
    pub treasury: Principal,
    /// The account that holds escrowed value on the asset ledger.
    pub custody: Principal,
    /// Fee rates. Defaults to 1% platform / 2% arbiter.
    #[serde(default)]
    pub fees: FeeSchedule,
}

impl EscrowConfig {
    /// Config with the default fee schedule.
    #[must_use]
    pub fn new(owner: Principal, treasury: Principal, custody: Principal) -> Self {
        Self {
            owner,
            treasury,
            custody,
            fees: FeeSchedule::default(),
        }
    }

    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// - `Serialization` if the document is malformed
    /// - `Configuration` if it fails [`EscrowConfig::validate`]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config is usable.
    ///
    /// # Errors
    /// Returns `Configuration` if any principal is null or the custody
    /// account doubles as the treasury.
    pub fn validate(&self) -> Result<()> {
        for (field, principal) in [
            ("owner", &self.owner),
            ("treasury", &self.treasury),
            ("custody", &self.custody),
        ] {
            if principal.is_null() {
                return Err(CovenantError::Configuration(format!(
                    "{field} must not be the null principal"
                )));
            }
        }
        if self.custody == self.treasury {
            return Err(CovenantError::Configuration(
                "custody and treasury must be distinct accounts".to_string(),
            ));
        }
        Ok(())
    }
}
