use cucumber::World;
use dishdash_engine::{
    db_types::{CurrentUser, MenuItem, Order},
    test_utils::TestMarketplace,
};

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub market: Option<TestMarketplace>,
    pub last_order: Option<Order>,
    pub last_error: Option<String>,
}

impl MarketWorld {
    pub fn market(&self) -> &TestMarketplace {
        self.market.as_ref().expect("Marketplace not initialised")
    }

    pub fn user(&self, name: &str) -> CurrentUser {
        let seeded = &self.market().seeded;
        match name {
            "Asha" => seeded.customer.as_user(),
            "Vikram" => seeded.second_customer.as_user(),
            "Tandoor House" => seeded.vendor.as_user(),
            "Dosa Corner" => seeded.other_vendor.as_user(),
            _ => panic!("Unknown user {name}"),
        }
    }

    pub fn menu_item(&self, name: &str) -> MenuItem {
        let seeded = &self.market().seeded;
        seeded
            .menu
            .iter()
            .chain(seeded.other_menu.iter())
            .find(|m| m.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("No menu item called {name}"))
    }
}
