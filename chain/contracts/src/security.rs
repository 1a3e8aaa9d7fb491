//! Shared security primitives for contract modules
//!
//! Provides the committee membership check used by every privileged entry
//! point and the single-entrant lock around external value transfer.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use types::ids::AccountId;

use crate::errors::{ConfigError, ProposalError};

/// Number of members on the approval committee.
pub const COMMITTEE_SIZE: usize = 3;

/// Committee membership check.
///
/// The member list is fixed at construction. There is no add or remove
/// path; a different committee means a different treasury.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    /// Members in construction order
    members: Vec<AccountId>,
    /// Lookup index over `members`
    index: HashSet<AccountId>,
}

impl AccessGuard {
    /// Build a guard from exactly [`COMMITTEE_SIZE`] distinct members.
    pub fn new(members: &[AccountId]) -> Result<Self, ConfigError> {
        if members.len() != COMMITTEE_SIZE {
            return Err(ConfigError::CommitteeSize {
                expected: COMMITTEE_SIZE,
                actual: members.len(),
            });
        }

        let mut index = HashSet::with_capacity(COMMITTEE_SIZE);
        for member in members {
            if !index.insert(*member) {
                return Err(ConfigError::DuplicateMember {
                    member: member.to_string(),
                });
            }
        }

        Ok(Self {
            members: members.to_vec(),
            index,
        })
    }

    /// True iff `caller` sits on the committee.
    pub fn is_authorized(&self, caller: &AccountId) -> bool {
        self.index.contains(caller)
    }

    /// Fail with `Unauthorized` unless `caller` sits on the committee.
    pub fn ensure(&self, caller: &AccountId) -> Result<(), ProposalError> {
        if !self.is_authorized(caller) {
            return Err(ProposalError::Unauthorized);
        }
        Ok(())
    }

    pub fn members(&self) -> &[AccountId] {
        &self.members
    }
}

/// Reentrancy lock preventing nested execution of protected operations.
///
/// A caller acquires the lock before the first check of a protected
/// operation and keeps the returned [`ExecutionGuard`] alive until the
/// external callout has returned. Any acquire attempt while the guard is
/// alive fails with `ReentrantCall`.
#[derive(Debug, Default)]
pub struct ExecutionLock {
    locked: AtomicBool,
}

impl ExecutionLock {
    /// Create a new unlocked lock.
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, or fail if an execution is already in flight.
    pub fn acquire(&self) -> Result<ExecutionGuard<'_>, ProposalError> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| ProposalError::ReentrantCall)?;
        Ok(ExecutionGuard { lock: self })
    }

    /// Check if currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`ExecutionLock`]. Releases the lock on drop,
/// including when the holder returns early with an error or unwinds.
#[derive(Debug)]
pub struct ExecutionGuard<'a> {
    lock: &'a ExecutionLock,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committee() -> Vec<AccountId> {
        vec![AccountId::new(), AccountId::new(), AccountId::new()]
    }

    // --- AccessGuard tests ---

    #[test]
    fn test_access_guard_members() {
        let members = committee();
        let guard = AccessGuard::new(&members).unwrap();
        for member in &members {
            assert!(guard.is_authorized(member));
        }
        assert!(!guard.is_authorized(&AccountId::new()));
        assert_eq!(guard.members(), members.as_slice());
    }

    #[test]
    fn test_access_guard_ensure() {
        let members = committee();
        let guard = AccessGuard::new(&members).unwrap();
        assert_eq!(guard.ensure(&members[1]), Ok(()));
        assert_eq!(
            guard.ensure(&AccountId::new()),
            Err(ProposalError::Unauthorized)
        );
    }

    #[test]
    fn test_access_guard_wrong_size() {
        let members = vec![AccountId::new(), AccountId::new()];
        assert_eq!(
            AccessGuard::new(&members).unwrap_err(),
            ConfigError::CommitteeSize {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_access_guard_duplicate_member() {
        let a = AccountId::new();
        let members = vec![a, AccountId::new(), a];
        assert!(matches!(
            AccessGuard::new(&members),
            Err(ConfigError::DuplicateMember { .. })
        ));
    }

    // --- ExecutionLock tests ---

    #[test]
    fn test_execution_lock_acquire_release() {
        let lock = ExecutionLock::new();
        assert!(!lock.is_locked());
        {
            let _guard = lock.acquire().unwrap();
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_execution_lock_nested_acquire_fails() {
        let lock = ExecutionLock::new();
        let _guard = lock.acquire().unwrap();
        assert_eq!(lock.acquire().unwrap_err(), ProposalError::ReentrantCall);
    }

    #[test]
    fn test_execution_lock_released_on_error_path() {
        fn failing(lock: &ExecutionLock) -> Result<(), ProposalError> {
            let _guard = lock.acquire()?;
            Err(ProposalError::TransferFailed)
        }

        let lock = ExecutionLock::new();
        assert_eq!(failing(&lock), Err(ProposalError::TransferFailed));
        assert!(!lock.is_locked());
        assert!(lock.acquire().is_ok(), "Should succeed after release");
    }
}
