//! Repository layer for database operations

pub mod loans;
pub mod sequences;
pub mod staff;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding the database connection pool.
///
/// Constructed once at startup and injected into services; there is no
/// global handle anywhere.
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub staff: staff::StaffRepository,
    pub loans: loans::LoansRepository,
    pub sequences: sequences::SequencesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            staff: staff::StaffRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            sequences: sequences::SequencesRepository::new(pool.clone()),
            pool,
        }
    }
}
