use crate::error::{SatchelResult, TowerSessionSnafu};
use axum_login::tower_sessions::Session;
use snafu::ResultExt;

const FLASH_KEY: &str = "satchel.flash";

/// Queue a notice for the next page this session renders.
pub async fn push_flash(session: &Session, message: impl Into<String>) -> SatchelResult<()> {
    let mut flashes: Vec<String> = session
        .get::<Vec<String>>(FLASH_KEY)
        .await
        .context(TowerSessionSnafu)?
        .unwrap_or_default();
    flashes.push(message.into());

    session
        .insert(FLASH_KEY, flashes)
        .await
        .context(TowerSessionSnafu)
}

pub async fn take_flashes(session: &Session) -> SatchelResult<Vec<String>> {
    Ok(session
        .remove::<Vec<String>>(FLASH_KEY)
        .await
        .context(TowerSessionSnafu)?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_sessions::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn flashes_are_shown_once_in_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert!(take_flashes(&session).await.unwrap().is_empty());

        push_flash(&session, "first").await.unwrap();
        push_flash(&session, "second").await.unwrap();

        assert_eq!(take_flashes(&session).await.unwrap(), vec!["first", "second"]);
        assert!(take_flashes(&session).await.unwrap().is_empty());
    }
}
