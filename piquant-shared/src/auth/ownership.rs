/// Resource ownership checks
///
/// The bearer guard proves *who* is calling; this module proves *that the
/// caller owns the specific record* being mutated. Update and delete run
/// [`require_owner`] before touching the record or its image file, so a
/// mismatch leaves both completely unchanged.
///
/// The check here is advisory from a concurrency standpoint: because owners
/// are immutable, the persistence layer re-asserts ownership in the same SQL
/// statement that performs the write (`... WHERE id = $1 AND owner_id = $2`),
/// closing any window between check and mutation.

use uuid::Uuid;

/// Error type for ownership checks
///
/// Deliberately distinct from authentication failures: a caller hitting this
/// error presented a perfectly valid credential for somebody else's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    /// The authenticated caller does not own the resource
    #[error("not authorized to modify this resource")]
    NotOwner,
}

/// A resource with a single owning user
pub trait Owned {
    /// The id of the user who created and owns this resource
    fn owner_id(&self) -> Uuid;
}

/// Requires that `user_id` owns `resource`
///
/// # Errors
///
/// Returns [`OwnershipError::NotOwner`] when the ids differ; the caller must
/// abandon the operation with no partial writes.
pub fn require_owner<T: Owned>(resource: &T, user_id: Uuid) -> Result<(), OwnershipError> {
    if resource.owner_id() == user_id {
        Ok(())
    } else {
        Err(OwnershipError::NotOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Record {
        owner_id: Uuid,
    }

    impl Owned for Record {
        fn owner_id(&self) -> Uuid {
            self.owner_id
        }
    }

    #[test]
    fn test_owner_passes() {
        let owner = Uuid::new_v4();
        let record = Record { owner_id: owner };

        assert_eq!(require_owner(&record, owner), Ok(()));
    }

    #[test]
    fn test_non_owner_is_rejected() {
        let record = Record {
            owner_id: Uuid::new_v4(),
        };

        assert_eq!(
            require_owner(&record, Uuid::new_v4()),
            Err(OwnershipError::NotOwner)
        );
    }
}
