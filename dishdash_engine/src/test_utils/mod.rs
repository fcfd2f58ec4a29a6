//! Helpers for integration tests: throwaway databases, a seeded marketplace and an in-memory payment gateway.
pub mod fake_gateway;
pub mod marketplace;
pub mod prepare_env;
pub mod seed;

pub use fake_gateway::FakeGateway;
pub use marketplace::{TestMarketplace, TEST_CURRENCY, TEST_KEY_SECRET};
pub use prepare_env::{prepare_test_env, random_db_path};
pub use seed::{seed_marketplace, SeededMarketplace, TEST_PASSWORD};
