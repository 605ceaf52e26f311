pub mod expense_service;
pub mod ledger_service;
pub mod payment_service;
pub mod refund_service;
pub mod settlement_service;

/// Whether a database error is a unique-constraint violation (Postgres
/// SQLSTATE 23505). The services translate these to conflicts instead of
/// leaking the raw integrity error.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
