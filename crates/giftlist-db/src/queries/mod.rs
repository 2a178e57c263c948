pub(crate) mod notifications;
pub(crate) mod presents;
pub(crate) mod recipients;
pub(crate) mod sessions;
pub(crate) mod users;

/// True when the statement failed on a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
