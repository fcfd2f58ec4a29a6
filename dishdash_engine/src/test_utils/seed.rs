use dd_common::Money;

use crate::{
    db_types::{MenuItem, NewProfile, Profile, Restaurant, Role},
    helpers::hash_password,
    sqlite_db::catalog,
    AuthManagement,
    SqliteDatabase,
};

pub const TEST_PASSWORD: &str = "correct horse battery";

/// A small marketplace: one customer and two vendors, each with a restaurant.
///
/// `menu` belongs to `restaurant`: Paneer Tikka (10.00), Garlic Naan (5.00) and Kulfi (3.00, unavailable).
/// `other_menu` belongs to `other_restaurant`: Masala Dosa (8.00).
#[derive(Debug, Clone)]
pub struct SeededMarketplace {
    pub customer: Profile,
    pub second_customer: Profile,
    pub vendor: Profile,
    pub other_vendor: Profile,
    pub restaurant: Restaurant,
    pub other_restaurant: Restaurant,
    pub menu: Vec<MenuItem>,
    pub other_menu: Vec<MenuItem>,
}

async fn profile(db: &SqliteDatabase, email: &str, name: &str, role: Role) -> Profile {
    let profile = NewProfile {
        email: email.to_string(),
        password_hash: hash_password(TEST_PASSWORD).expect("Could not hash test password"),
        role,
        full_name: name.to_string(),
        phone: Some("+91 98765 43210".to_string()),
    };
    db.insert_profile(profile).await.expect("Could not insert test profile")
}

pub async fn seed_marketplace(db: &SqliteDatabase) -> SeededMarketplace {
    let customer = profile(db, "asha@example.com", "Asha Rao", Role::Customer).await;
    let second_customer = profile(db, "vikram@example.com", "Vikram Shah", Role::Customer).await;
    let vendor = profile(db, "tandoor@example.com", "Meera Kapoor", Role::Vendor).await;
    let other_vendor = profile(db, "dosa@example.com", "Ravi Iyer", Role::Vendor).await;

    let mut conn = db.pool().acquire().await.expect("Could not acquire connection");
    let restaurant = catalog::insert_restaurant(vendor.id, "Tandoor House", "12 MG Road", &mut conn)
        .await
        .expect("Could not insert restaurant");
    let other_restaurant = catalog::insert_restaurant(other_vendor.id, "Dosa Corner", "4 Church Street", &mut conn)
        .await
        .expect("Could not insert restaurant");
    let mut menu = Vec::new();
    for (name, price, available) in [("Paneer Tikka", 10, true), ("Garlic Naan", 5, true), ("Kulfi", 3, false)] {
        let item =
            catalog::insert_menu_item(restaurant.id, name, None, Money::from_major(price), available, &mut conn)
                .await
                .expect("Could not insert menu item");
        menu.push(item);
    }
    let dosa = catalog::insert_menu_item(
        other_restaurant.id,
        "Masala Dosa",
        Some("Crisp rice crepe with potato masala"),
        Money::from_major(8),
        true,
        &mut conn,
    )
    .await
    .expect("Could not insert menu item");
    SeededMarketplace {
        customer,
        second_customer,
        vendor,
        other_vendor,
        restaurant,
        other_restaurant,
        menu,
        other_menu: vec![dosa],
    }
}
