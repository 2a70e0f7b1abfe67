use thiserror::Error;

/// Everything the tracker core can fail with.
///
/// The calling layer decides how each kind is presented: `DuplicateShow`,
/// `DuplicateShowName` and `AlreadyFollowed` read as "already tracked",
/// `NotFound` as a missing resource, catalog and storage failures as a
/// generic error.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("show {0} is already stored")]
    DuplicateShow(i64),

    #[error("another show named {0:?} is already stored")]
    DuplicateShowName(String),

    #[error("show {0} is already followed")]
    AlreadyFollowed(i64),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("episode {episode_id} does not belong to show {show_id}")]
    EpisodeNotInShow { show_id: i64, episode_id: i64 },

    #[error("catalog lookup failed: {0}")]
    CatalogLookupFailed(String),

    #[error("catalog returned invalid data: {0}")]
    CatalogDataInvalid(String),

    #[error("catalog request failed: {0}")]
    TransportFailure(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("could not open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("could not migrate database: {0}")]
    Migration(String),
}

impl TrackerError {
    pub(crate) fn show_not_found(id: i64) -> Self {
        TrackerError::NotFound { kind: "show", id }
    }

    pub(crate) fn episode_not_found(id: i64) -> Self {
        TrackerError::NotFound { kind: "episode", id }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(
            TrackerError::show_not_found(1399).to_string(),
            "show 1399 not found"
        );
        assert_eq!(
            TrackerError::episode_not_found(63056).to_string(),
            "episode 63056 not found"
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: TrackerError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, TrackerError::Storage(_)));
    }
}
