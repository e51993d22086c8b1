//! Identity store implementations
//!
//! `InMemoryIdentityStore` implements every repository trait over one shared
//! state; the PostgreSQL repositories implement one trait each over a pool.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryIdentityStore;
pub use postgres::{
    PostgresOtpRepository, PostgresSessionRepository, PostgresTeamRepository,
    PostgresUserRepository,
};
