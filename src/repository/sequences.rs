//! Sequential human-readable code generation
//!
//! Library cards and employee codes are per-year sequences. The counter
//! lives in `code_sequences` and advances through a single atomic upsert,
//! so two concurrent creations can never draw the same number. The highest
//! code already present in the target table is fed in as a seed, which lets
//! the counter adopt migrated records that predate it.

use sqlx::{Pool, Postgres};

use crate::error::{AppError, AppResult};

/// Zero-padded suffix width for library cards (`LIB{YY}NNNNN`).
const CARD_SUFFIX_WIDTH: usize = 5;
/// Zero-padded suffix width for employee codes (`LIB-{YYYY}-NNNN`).
const EMPLOYEE_SUFFIX_WIDTH: usize = 4;

#[derive(Clone)]
pub struct SequencesRepository {
    pool: Pool<Postgres>,
}

impl SequencesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Next library card number for the given year, e.g. `LIB2600042`.
    pub async fn next_library_card(&self, year: i32) -> AppResult<String> {
        let prefix = library_card_prefix(year);
        let seed = self
            .max_suffix("users", "library_card", &prefix, CARD_SUFFIX_WIDTH)
            .await?;
        let next = self.next_in_scope(&format!("library_card:{}", year), seed).await?;
        format_code(&prefix, next, CARD_SUFFIX_WIDTH)
    }

    /// Next employee code for the given year, e.g. `LIB-2026-0007`.
    pub async fn next_employee_code(&self, year: i32) -> AppResult<String> {
        let prefix = employee_code_prefix(year);
        let seed = self
            .max_suffix("staff", "employee_code", &prefix, EMPLOYEE_SUFFIX_WIDTH)
            .await?;
        let next = self.next_in_scope(&format!("employee_code:{}", year), seed).await?;
        format_code(&prefix, next, EMPLOYEE_SUFFIX_WIDTH)
    }

    /// Advance the per-scope counter atomically. The upsert both creates the
    /// counter on first use and folds in the seed, so the read-max/increment
    /// race of a naive implementation cannot occur.
    async fn next_in_scope(&self, scope: &str, seed: i64) -> AppResult<i64> {
        let next: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO code_sequences (scope, last_value)
            VALUES ($1, $2 + 1)
            ON CONFLICT (scope)
            DO UPDATE SET last_value = GREATEST(code_sequences.last_value, $2) + 1
            RETURNING last_value
            "#,
        )
        .bind(scope)
        .bind(seed)
        .fetch_one(&self.pool)
        .await?;

        Ok(next)
    }

    /// Highest numeric suffix among existing codes for the prefix, or 0.
    async fn max_suffix(
        &self,
        table: &str,
        column: &str,
        prefix: &str,
        width: usize,
    ) -> AppResult<i64> {
        // Identifiers come from the two call sites above, never from input.
        let query = format!(
            "SELECT MAX({column}) FROM {table} WHERE {column} LIKE $1",
            table = table,
            column = column
        );
        let max_code: Option<String> = sqlx::query_scalar(&query)
            .bind(format!("{}%", prefix))
            .fetch_one(&self.pool)
            .await?;

        Ok(max_code
            .and_then(|code| parse_suffix(&code, width))
            .unwrap_or(0))
    }
}

pub fn library_card_prefix(year: i32) -> String {
    format!("LIB{:02}", year % 100)
}

pub fn employee_code_prefix(year: i32) -> String {
    format!("LIB-{}-", year)
}

/// Trailing numeric suffix of a code, if well-formed. Migrated codes may
/// contain arbitrary text, so the slice must land on a char boundary.
pub fn parse_suffix(code: &str, width: usize) -> Option<i64> {
    let start = code.len().checked_sub(width)?;
    code.get(start..)?.parse().ok()
}

/// Prefix plus zero-padded suffix. Overflowing the padded width is a hard
/// failure: a wider code would break lexicographic ordering and the
/// uniqueness of the scheme.
fn format_code(prefix: &str, n: i64, width: usize) -> AppResult<String> {
    let max = 10_i64.pow(width as u32) - 1;
    if n > max {
        return Err(AppError::CodeGeneration(format!(
            "sequence for prefix {} exhausted ({} > {})",
            prefix, n, max
        )));
    }
    Ok(format!("{}{:0width$}", prefix, n, width = width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_card_prefix_uses_two_digit_year() {
        assert_eq!(library_card_prefix(2026), "LIB26");
        assert_eq!(library_card_prefix(2004), "LIB04");
    }

    #[test]
    fn employee_code_prefix_uses_full_year() {
        assert_eq!(employee_code_prefix(2026), "LIB-2026-");
    }

    #[test]
    fn codes_are_zero_padded() {
        assert_eq!(format_code("LIB26", 42, 5).unwrap(), "LIB2600042");
        assert_eq!(format_code("LIB-2026-", 7, 4).unwrap(), "LIB-2026-0007");
    }

    #[test]
    fn suffix_parses_back() {
        assert_eq!(parse_suffix("LIB2600042", 5), Some(42));
        assert_eq!(parse_suffix("LIB-2026-0007", 4), Some(7));
        assert_eq!(parse_suffix("LIB26", 5), None);
        assert_eq!(parse_suffix("LIB26abcde", 5), None);
    }

    #[test]
    fn multibyte_codes_parse_without_panicking() {
        // The tail slice lands inside the two-byte 'é'.
        assert_eq!(parse_suffix("LIB26é2345", 5), None);
        assert_eq!(parse_suffix("LIBé600042", 5), Some(42));
        assert_eq!(parse_suffix("日本語", 5), None);
    }

    #[test]
    fn exhausted_width_fails_instead_of_widening() {
        assert_eq!(format_code("LIB26", 99_999, 5).unwrap(), "LIB2699999");
        assert!(matches!(
            format_code("LIB26", 100_000, 5),
            Err(AppError::CodeGeneration(_))
        ));
    }
}
