//! Owner-only access gate for administrative operations.
//!
//! One principal owns the service. Only the owner may redirect the treasury
//! or hand ownership to someone else; every other caller is rejected with
//! `UnauthorizedAccess` before any argument is looked at.

use covenant_types::{CovenantError, Principal, Result};

/// Holds the current owner and checks callers against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerGate {
    owner: Principal,
}

impl OwnerGate {
    #[must_use]
    pub fn new(owner: Principal) -> Self {
        Self { owner }
    }

    #[must_use]
    pub fn owner(&self) -> Principal {
        self.owner
    }

    /// # Errors
    /// Returns `UnauthorizedAccess` unless `caller` is the owner.
    pub fn authorize(&self, caller: Principal) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(CovenantError::UnauthorizedAccess { caller })
        }
    }

    /// Check that `caller` may hand ownership to `new_owner`.
    ///
    /// # Errors
    /// - `UnauthorizedAccess` unless `caller` is the owner
    /// - `InvalidAddress` if `new_owner` is null
    pub fn check_handover(&self, caller: Principal, new_owner: Principal) -> Result<()> {
        self.authorize(caller)?;
        if new_owner.is_null() {
            return Err(CovenantError::InvalidAddress {
                field: "owner",
                principal: new_owner,
            });
        }
        Ok(())
    }

    /// Replace the owner, returning the previous one. Callers run
    /// [`OwnerGate::check_handover`] first.
    pub fn hand_over(&mut self, new_owner: Principal) -> Principal {
        std::mem::replace(&mut self.owner, new_owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_authorized() {
        let owner = Principal::random();
        let gate = OwnerGate::new(owner);
        assert!(gate.authorize(owner).is_ok());

        let stranger = Principal::random();
        let err = gate.authorize(stranger).unwrap_err();
        assert!(matches!(err, CovenantError::UnauthorizedAccess { caller } if caller == stranger));
    }

    #[test]
    fn handover_checks_caller_before_address() {
        let owner = Principal::random();
        let gate = OwnerGate::new(owner);

        let err = gate
            .check_handover(Principal::random(), Principal::NULL)
            .unwrap_err();
        assert!(matches!(err, CovenantError::UnauthorizedAccess { .. }));

        let err = gate.check_handover(owner, Principal::NULL).unwrap_err();
        assert!(matches!(err, CovenantError::InvalidAddress { field: "owner", .. }));
    }

    #[test]
    fn hand_over_moves_authority() {
        let (old, new) = (Principal::random(), Principal::random());
        let mut gate = OwnerGate::new(old);
        gate.check_handover(old, new).unwrap();
        assert_eq!(gate.hand_over(new), old);
        assert!(gate.authorize(old).is_err());
        assert!(gate.authorize(new).is_ok());
    }
}
