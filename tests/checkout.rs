//! End-to-end checkout workflow tests against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use ferrocart::checkout::CheckoutService;
use ferrocart::domain::{Order, Product, User};
use ferrocart::notify::{LogNotifier, Notifier, NotifyError};
use ferrocart::storage::{
    Catalog, CartStore, MemoryStore, NewProduct, NewUser, OrderStore, Store, UserStore,
};
use ferrocart::CommerceError;

fn service(store: &Arc<MemoryStore>) -> CheckoutService {
    CheckoutService::new(store.clone(), Arc::new(LogNotifier))
}

async fn seed_user(store: &MemoryStore, name: &str) -> User {
    store
        .create_user(NewUser {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
        })
        .await
        .unwrap()
}

async fn seed_product(store: &MemoryStore, name: &str, price: Decimal, stock: Option<i32>) -> Product {
    store
        .create_product(NewProduct {
            sku: None,
            name: name.into(),
            description: None,
            price,
            currency: None,
            stock,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_checkout_commits_order_and_empties_cart() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);

    let user = seed_user(&store, "Alice").await;
    let product_a = seed_product(&store, "Product A", Decimal::new(1000, 2), Some(5)).await;
    let product_b = seed_product(&store, "Product B", Decimal::new(500, 2), Some(1)).await;
    store.add_cart_item(user.id, product_a.id, 2).await.unwrap();
    store.add_cart_item(user.id, product_b.id, 1).await.unwrap();

    let order = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap();

    assert_eq!(order.items.len(), 2);
    assert_eq!(order.status.as_str(), "PREPARING");
    assert_eq!(order.total(), Decimal::new(2500, 2));
    assert_eq!(order.items[0].product_id, product_a.id);
    assert_eq!(order.items[0].unit_price, Decimal::new(1000, 2));
    assert_eq!(order.items[1].product_id, product_b.id);

    // Stock was decremented, the cart is empty, and the order is durable.
    let a = store.find_product(product_a.id).await.unwrap().unwrap();
    let b = store.find_product(product_b.id).await.unwrap().unwrap();
    assert_eq!(a.stock, Some(3));
    assert_eq!(b.stock, Some(0));
    assert!(store.get_cart(user.id).await.unwrap().is_empty());
    assert!(store.find_order(order.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_checkout_with_empty_cart_persists_nothing() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);
    let user = seed_user(&store, "Bob").await;

    let err = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap_err();

    assert!(matches!(err, CommerceError::EmptyCart));
    assert_eq!(store.list_orders(10, 0).await.unwrap().1, 0);
}

#[tokio::test]
async fn test_checkout_for_unknown_user_fails() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);
    let ghost = Uuid::new_v4();

    let err = checkout
        .create_order(ghost, "123 Main St", "555-0100")
        .await
        .unwrap_err();

    assert!(matches!(err, CommerceError::UserNotFound(id) if id == ghost));
}

#[tokio::test]
async fn test_out_of_stock_leaves_every_stock_value_untouched() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);

    let user = seed_user(&store, "Carol").await;
    let plentiful = seed_product(&store, "Plentiful", Decimal::new(1000, 2), Some(10)).await;
    let scarce = seed_product(&store, "Scarce", Decimal::new(500, 2), Some(1)).await;
    store.add_cart_item(user.id, plentiful.id, 2).await.unwrap();
    store.add_cart_item(user.id, scarce.id, 5).await.unwrap();

    let err = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CommerceError::OutOfStock { requested: 5, available: 1, .. }
    ));

    // All-or-nothing: the first item's stock did not move either, the cart
    // is intact, and no order exists.
    let p = store.find_product(plentiful.id).await.unwrap().unwrap();
    let s = store.find_product(scarce.id).await.unwrap().unwrap();
    assert_eq!(p.stock, Some(10));
    assert_eq!(s.stock, Some(1));
    assert_eq!(store.get_cart(user.id).await.unwrap().item_count(), 2);
    assert_eq!(store.list_orders(10, 0).await.unwrap().1, 0);
}

#[tokio::test]
async fn test_unset_stock_is_reported_distinctly() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);

    let user = seed_user(&store, "Dave").await;
    let unstocked = seed_product(&store, "Unstocked", Decimal::new(1000, 2), None).await;
    store.add_cart_item(user.id, unstocked.id, 1).await.unwrap();

    let err = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap_err();

    assert!(matches!(err, CommerceError::UndefinedStock { .. }));
    assert_eq!(store.list_orders(10, 0).await.unwrap().1, 0);
}

#[tokio::test]
async fn test_product_removed_after_carting_fails_checkout() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);

    let user = seed_user(&store, "Erin").await;
    let product = seed_product(&store, "Fleeting", Decimal::new(1000, 2), Some(5)).await;
    store.add_cart_item(user.id, product.id, 1).await.unwrap();
    store.delete_product(product.id).await.unwrap();

    let err = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap_err();

    assert!(matches!(err, CommerceError::ProductNotFound(id) if id == product.id));
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);

    // Stock 3, two buyers wanting 2 each: at most one can win.
    let product = seed_product(&store, "Contested", Decimal::new(1000, 2), Some(3)).await;
    let first = seed_user(&store, "First").await;
    let second = seed_user(&store, "Second").await;
    store.add_cart_item(first.id, product.id, 2).await.unwrap();
    store.add_cart_item(second.id, product.id, 2).await.unwrap();

    let (a, b) = tokio::join!(
        {
            let checkout = checkout.clone();
            let user_id = first.id;
            tokio::spawn(async move { checkout.create_order(user_id, "1 First St", "555-0001").await })
        },
        {
            let checkout = checkout.clone();
            let user_id = second.id;
            tokio::spawn(async move { checkout.create_order(user_id, "2 Second St", "555-0002").await })
        }
    );
    let results = [a.unwrap(), b.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one concurrent checkout may succeed");
    let loss = results.iter().find(|r| r.is_err()).unwrap().as_ref().unwrap_err();
    assert!(matches!(
        loss,
        CommerceError::OutOfStock { .. } | CommerceError::Transaction(_)
    ));

    // Stock went down exactly once and never negative.
    let p = store.find_product(product.id).await.unwrap().unwrap();
    assert_eq!(p.stock, Some(1));
    assert_eq!(store.list_orders(10, 0).await.unwrap().1, 1);
}

#[tokio::test]
async fn test_clearing_an_already_empty_cart_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "Frank").await;

    store.clear_cart(user.id).await.unwrap();
    store.clear_cart(user.id).await.unwrap();
    assert!(store.get_cart(user.id).await.unwrap().is_empty());
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn order_confirmation(&self, _order: &Order) -> Result<(), NotifyError> {
        Err(NotifyError::Publish("notification channel unreachable".into()))
    }
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_the_order() {
    let store = Arc::new(MemoryStore::new());
    let checkout = CheckoutService::new(
        store.clone() as Arc<dyn Store>,
        Arc::new(FailingNotifier),
    );

    let user = seed_user(&store, "Grace").await;
    let product = seed_product(&store, "Gadget", Decimal::new(1000, 2), Some(5)).await;
    store.add_cart_item(user.id, product.id, 1).await.unwrap();

    let order = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap();

    // The commit stands even though the confirmation could not be sent.
    assert!(store.find_order(order.id).await.unwrap().is_some());
    assert_eq!(
        store.find_product(product.id).await.unwrap().unwrap().stock,
        Some(4)
    );
}

#[tokio::test]
async fn test_order_prices_do_not_float_with_the_catalog() {
    let store = Arc::new(MemoryStore::new());
    let checkout = service(&store);

    let user = seed_user(&store, "Heidi").await;
    let product = seed_product(&store, "Volatile", Decimal::new(1000, 2), Some(5)).await;
    store.add_cart_item(user.id, product.id, 2).await.unwrap();

    let order = checkout
        .create_order(user.id, "123 Main St", "555-0100")
        .await
        .unwrap();

    store
        .update_product(
            product.id,
            NewProduct {
                sku: None,
                name: "Volatile".into(),
                description: None,
                price: Decimal::new(99_00, 2),
                currency: None,
                stock: Some(3),
            },
        )
        .await
        .unwrap();

    let reloaded = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.items[0].unit_price, Decimal::new(1000, 2));
    assert_eq!(reloaded.total(), Decimal::new(2000, 2));
}
