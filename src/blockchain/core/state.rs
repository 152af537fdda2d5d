use crate::crypto::ValidatorKey;
use crate::error::ChainError;
use crate::transaction::Transaction;
use std::collections::HashMap;

/// Remaining mint permissions per validator.
///
/// Derived state only: it is rebuilt by replaying blocks and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionState {
    balances: HashMap<ValidatorKey, u32>,
}

impl PermissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a fresh chain: only the root validator may mint.
    pub fn seeded(root: ValidatorKey, permissions: u32) -> Self {
        let mut state = Self::new();
        state.balances.insert(root, permissions);
        state
    }

    pub fn get_balance(&self, validator: &ValidatorKey) -> u32 {
        self.balances.get(validator).copied().unwrap_or(0)
    }

    pub fn is_authorized(&self, validator: &ValidatorKey) -> bool {
        self.get_balance(validator) > 0
    }

    pub fn validators(&self) -> impl Iterator<Item = (&ValidatorKey, u32)> {
        self.balances.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Runs every check `apply_transaction` would, without writing.
    pub fn check_transaction(&self, validator: &ValidatorKey, tx: &Transaction) -> Result<(), ChainError> {
        let balance = self.get_balance(validator);
        if balance == 0 {
            return Err(ChainError::UnauthorizedValidator(validator.to_hex()));
        }

        if let Transaction::Permission(p) = tx {
            if balance <= p.amount {
                return Err(ChainError::InsufficientDelegationAuthority {
                    balance,
                    requested: p.amount,
                });
            }
            // Self-delegation nets to zero and cannot overflow.
            if &p.delegate != validator {
                let delegate_balance = self.get_balance(&p.delegate);
                if delegate_balance.checked_add(p.amount).is_none() {
                    return Err(ChainError::DelegationOverflow {
                        balance: delegate_balance,
                        amount: p.amount,
                    });
                }
            }
        }
        Ok(())
    }

    /// Charges `validator` for minting a block carrying `tx`.
    ///
    /// All checks run before the first write, so an error leaves the state
    /// untouched.
    pub fn apply_transaction(&mut self, validator: &ValidatorKey, tx: &Transaction) -> Result<(), ChainError> {
        self.check_transaction(validator, tx)?;

        if let Transaction::Permission(p) = tx {
            *self.balances.entry(*validator).or_insert(0) -= p.amount;
            *self.balances.entry(p.delegate).or_insert(0) += p.amount;
        }

        // Minting always costs one permission.
        *self.balances.entry(*validator).or_insert(0) -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::VALIDATOR_SIZE;

    fn key(b: u8) -> ValidatorKey {
        ValidatorKey::from_bytes([b; VALIDATOR_SIZE])
    }

    #[test]
    fn test_entry_costs_one() {
        let mut state = PermissionState::seeded(key(1), 3);
        state.apply_transaction(&key(1), &Transaction::entry(b"x".to_vec())).unwrap();
        assert_eq!(state.get_balance(&key(1)), 2);
    }

    #[test]
    fn test_unknown_validator_rejected() {
        let mut state = PermissionState::seeded(key(1), 3);
        let err = state.apply_transaction(&key(2), &Transaction::entry(Vec::new())).unwrap_err();
        assert!(matches!(err, ChainError::UnauthorizedValidator(_)));
    }

    #[test]
    fn test_exhausted_validator_rejected() {
        let mut state = PermissionState::seeded(key(1), 1);
        state.apply_transaction(&key(1), &Transaction::entry(Vec::new())).unwrap();
        assert_eq!(state.get_balance(&key(1)), 0);
        assert!(!state.is_authorized(&key(1)));

        let before = state.clone();
        assert!(state.apply_transaction(&key(1), &Transaction::entry(Vec::new())).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_delegation_moves_permissions() {
        let mut state = PermissionState::seeded(key(1), 200);
        state.apply_transaction(&key(1), &Transaction::permission(100, key(2))).unwrap();
        assert_eq!(state.get_balance(&key(1)), 99);
        assert_eq!(state.get_balance(&key(2)), 100);

        state.apply_transaction(&key(1), &Transaction::permission(10, key(2))).unwrap();
        assert_eq!(state.get_balance(&key(1)), 88);
        assert_eq!(state.get_balance(&key(2)), 110);
    }

    #[test]
    fn test_delegating_whole_balance_rejected() {
        let mut state = PermissionState::seeded(key(1), 100);
        let before = state.clone();

        let err = state.apply_transaction(&key(1), &Transaction::permission(100, key(2))).unwrap_err();
        assert_eq!(
            err,
            ChainError::InsufficientDelegationAuthority {
                balance: 100,
                requested: 100
            }
        );
        assert_eq!(state, before);

        // One less than the balance leaves exactly the mint cost.
        state.apply_transaction(&key(1), &Transaction::permission(99, key(2))).unwrap();
        assert_eq!(state.get_balance(&key(1)), 0);
        assert_eq!(state.get_balance(&key(2)), 99);
    }

    #[test]
    fn test_self_delegation_only_costs_mint() {
        let mut state = PermissionState::seeded(key(1), 10);
        state.apply_transaction(&key(1), &Transaction::permission(5, key(1))).unwrap();
        assert_eq!(state.get_balance(&key(1)), 9);
    }

    #[test]
    fn test_delegate_overflow_rejected() {
        let mut state = PermissionState::seeded(key(1), u32::MAX);
        state.balances.insert(key(2), u32::MAX - 1);
        let before = state.clone();

        let err = state.apply_transaction(&key(1), &Transaction::permission(10, key(2))).unwrap_err();
        assert_eq!(
            err,
            ChainError::DelegationOverflow {
                balance: u32::MAX - 1,
                amount: 10
            }
        );
        assert_eq!(state, before);

        // Topping the delegate up to exactly the maximum is fine.
        state.apply_transaction(&key(1), &Transaction::permission(1, key(2))).unwrap();
        assert_eq!(state.get_balance(&key(2)), u32::MAX);
        assert_eq!(state.get_balance(&key(1)), u32::MAX - 2);
    }

    #[test]
    fn test_check_does_not_write() {
        let state = PermissionState::seeded(key(1), 5);
        let before = state.clone();
        state.check_transaction(&key(1), &Transaction::permission(4, key(2))).unwrap();
        assert!(state.check_transaction(&key(2), &Transaction::entry(Vec::new())).is_err());
        assert_eq!(state, before);
    }
}
