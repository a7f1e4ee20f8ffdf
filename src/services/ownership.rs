use std::future::Future;

use uuid::Uuid;

use crate::error::{AppError, Result};

/// A resource with an immutable owner set at creation.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// Loads a resource and verifies the actor owns it.
///
/// The single choke point for mutation authorization: handlers call this
/// before touching persistence, never re-implementing the owner check
/// inline. `NotFound` when the loader comes up empty, `Forbidden` when the
/// owner differs. Idempotent; safe to call more than once per request.
pub async fn authorize<T, F, Fut>(actor: Uuid, loader: F) -> Result<T>
where
    T: Owned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let resource = loader().await?.ok_or(AppError::NotFound)?;

    if resource.owner_id() != actor {
        tracing::warn!("❌ Actor {} is not the owner of the resource", actor);
        return Err(AppError::Forbidden);
    }

    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        owner: Uuid,
        body: String,
    }

    impl Owned for Note {
        fn owner_id(&self) -> Uuid {
            self.owner
        }
    }

    #[tokio::test]
    async fn owner_gets_the_resource_back_unchanged() {
        let owner = Uuid::new_v4();
        let note = Note {
            owner,
            body: "hello".to_string(),
        };
        let loaded = note.clone();

        let result = authorize(owner, || async move { Ok(Some(loaded)) })
            .await
            .unwrap();
        assert_eq!(result, note);
    }

    #[tokio::test]
    async fn any_other_actor_is_forbidden() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let note = Note {
            owner,
            body: "hello".to_string(),
        };

        let result = authorize(intruder, || async move { Ok(Some(note)) }).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let result = authorize::<Note, _, _>(Uuid::new_v4(), || async { Ok(None) }).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn loader_errors_pass_through() {
        let result = authorize::<Note, _, _>(Uuid::new_v4(), || async {
            Err(AppError::Internal("load failed".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
