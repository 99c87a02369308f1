// Account lifecycle - deleting a member and everything tied to them.
//
// The caller must have verified the request already (token checks live outside
// this core). Nothing in the moderation pipeline depends on this module.

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to delete identity: {0}")]
    IdentityDeletion(String),

    #[error("Invalid user id")]
    InvalidUserId,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Where member data lives.
///
/// Each method is idempotent: deleting something that is already gone is
/// not an error.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Remove every profile the user owns. Returns how many were removed.
    async fn delete_profiles(&self, user_id: &str) -> Result<u64, AccountError>;

    /// Remove the user's private record. Returns how many rows were removed.
    async fn delete_private_record(&self, user_id: &str) -> Result<u64, AccountError>;

    /// Remove the authentication identity itself.
    async fn delete_identity(&self, user_id: &str) -> Result<(), AccountError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Summary of a completed deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub profiles_removed: u64,
    pub private_records_removed: u64,
}

pub struct AccountService<S: AccountStore> {
    store: S,
}

impl<S: AccountStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Delete domain records, then the identity.
    ///
    /// Record cleanup is best-effort: a failure there is logged and the
    /// identity is still removed. Only an identity failure is reported.
    pub async fn delete_account(&self, user_id: &str) -> Result<DeletionReport, AccountError> {
        if user_id.trim().is_empty() {
            return Err(AccountError::InvalidUserId);
        }

        let profiles_removed = match self.store.delete_profiles(user_id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to delete profiles");
                0
            }
        };

        let private_records_removed = match self.store.delete_private_record(user_id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to delete private record");
                0
            }
        };

        self.store.delete_identity(user_id).await.map_err(|e| match e {
            AccountError::IdentityDeletion(_) => e,
            other => AccountError::IdentityDeletion(other.to_string()),
        })?;

        tracing::info!(
            user_id,
            profiles_removed,
            private_records_removed,
            "Account deleted"
        );

        Ok(DeletionReport {
            profiles_removed,
            private_records_removed,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store for testing
    #[derive(Default)]
    struct MockAccountStore {
        calls: Mutex<Vec<&'static str>>,
        fail_profiles: bool,
        fail_identity: bool,
    }

    #[async_trait]
    impl AccountStore for MockAccountStore {
        async fn delete_profiles(&self, _user_id: &str) -> Result<u64, AccountError> {
            self.calls.lock().unwrap().push("profiles");
            if self.fail_profiles {
                return Err(AccountError::Storage("profiles table locked".to_string()));
            }
            Ok(2)
        }

        async fn delete_private_record(&self, _user_id: &str) -> Result<u64, AccountError> {
            self.calls.lock().unwrap().push("private");
            Ok(1)
        }

        async fn delete_identity(&self, _user_id: &str) -> Result<(), AccountError> {
            self.calls.lock().unwrap().push("identity");
            if self.fail_identity {
                return Err(AccountError::Storage("auth backend down".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deletes_in_order() {
        let service = AccountService::new(MockAccountStore::default());

        let report = service.delete_account("user-1").await.unwrap();

        assert_eq!(
            report,
            DeletionReport {
                profiles_removed: 2,
                private_records_removed: 1,
            }
        );
        assert_eq!(
            *service.store.calls.lock().unwrap(),
            vec!["profiles", "private", "identity"]
        );
    }

    #[tokio::test]
    async fn test_record_failure_does_not_stop_identity_deletion() {
        let service = AccountService::new(MockAccountStore {
            fail_profiles: true,
            ..Default::default()
        });

        let report = service.delete_account("user-1").await.unwrap();

        assert_eq!(report.profiles_removed, 0);
        assert!(service.store.calls.lock().unwrap().contains(&"identity"));
    }

    #[tokio::test]
    async fn test_identity_failure_is_reported() {
        let service = AccountService::new(MockAccountStore {
            fail_identity: true,
            ..Default::default()
        });

        let err = service.delete_account("user-1").await.unwrap_err();

        assert!(matches!(err, AccountError::IdentityDeletion(ref m) if m.contains("auth backend down")));
    }

    #[tokio::test]
    async fn test_blank_user_id_rejected() {
        let service = AccountService::new(MockAccountStore::default());

        let err = service.delete_account("  ").await.unwrap_err();

        assert!(matches!(err, AccountError::InvalidUserId));
        assert!(service.store.calls.lock().unwrap().is_empty());
    }
}
