//! SQLite backend for the DishDash engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
