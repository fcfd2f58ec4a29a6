use cucumber::given;
use dishdash_engine::test_utils::TestMarketplace;

use crate::cucumber::MarketWorld;

#[given("a seeded marketplace")]
async fn seeded_marketplace(world: &mut MarketWorld) {
    world.market = Some(TestMarketplace::new().await);
}
