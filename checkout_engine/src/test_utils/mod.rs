//! Helpers for tests that need a real database: a throwaway SQLite file with the schema applied, and functions to seed
//! the catalog tables that the engine itself never writes to.
pub mod prepare_env;
pub mod seed;
