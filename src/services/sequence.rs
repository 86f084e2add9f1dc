//! Sequential identifier generation
//!
//! Plot numbers, booking numbers and user codes all follow the same scheme:
//! fixed prefix, zero-padded numeric suffix, next value derived from the
//! current highest. Zero-padding keeps lexicographic order equal to numeric
//! order, which is what lets the stores answer "highest" with a plain sort.
//!
//! Parsing is fail-closed: a malformed highest value is a `Sequencing` error,
//! never a silent restart from 1. Restarting would hand out numbers that
//! collide with existing documents.

use bson::oid::ObjectId;

use crate::db::schemas::{
    user_code_prefix, BOOKING_NUMBER_PREFIX, BOOKING_NUMBER_WIDTH, PLOT_NUMBER_PREFIX,
    PLOT_NUMBER_WIDTH, USER_CODE_WIDTH,
};
use crate::store::Store;
use crate::types::{LedgerError, Result};

/// Compute the successor of `highest` under a prefix/width scheme.
/// `None` starts the sequence at 1. A suffix past the padded width is legal
/// (the sequence simply grows a digit); a suffix that does not parse is not.
pub fn next_in_sequence(prefix: &str, width: usize, highest: Option<&str>) -> Result<String> {
    let n = match highest {
        None => 0,
        Some(value) => {
            let suffix = value.strip_prefix(prefix).ok_or_else(|| {
                LedgerError::Sequencing(format!(
                    "Existing identifier {} does not match prefix {}",
                    value, prefix
                ))
            })?;
            if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                return Err(LedgerError::Sequencing(format!(
                    "Existing identifier {} has a non-numeric suffix",
                    value
                )));
            }
            suffix.parse::<u64>().map_err(|_| {
                LedgerError::Sequencing(format!("Existing identifier {} is out of range", value))
            })?
        }
    };

    Ok(format!("{}{:0width$}", prefix, n + 1, width = width))
}

/// Next plot number within a colony (PLOT-NNNN, scoped to the colony)
pub async fn next_plot_number(store: &dyn Store, colony: ObjectId) -> Result<String> {
    let highest = store.highest_plot_number(colony).await?;
    next_in_sequence(PLOT_NUMBER_PREFIX, PLOT_NUMBER_WIDTH, highest.as_deref())
}

/// Next booking number (BKNNNNNN, global)
pub async fn next_booking_number(store: &dyn Store) -> Result<String> {
    let highest = store.highest_booking_number().await?;
    next_in_sequence(
        BOOKING_NUMBER_PREFIX,
        BOOKING_NUMBER_WIDTH,
        highest.as_deref(),
    )
}

/// Next user code for a role (e.g. AG-00001, scoped to the role prefix)
pub async fn next_user_code(store: &dyn Store, role_name: &str) -> Result<String> {
    let prefix = format!("{}-", user_code_prefix(role_name));
    let highest = store.highest_user_code(user_code_prefix(role_name)).await?;
    next_in_sequence(&prefix, USER_CODE_WIDTH, highest.as_deref())
}
