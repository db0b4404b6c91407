//! End-to-end checkout pipeline: cart mutations, coupon application, and
//! order assembly.

use clementine_checkout::CheckoutError;
use clementine_core::{DiscountType, UserId};
use rust_decimal::Decimal;

use clementine_integration_tests::{TestContext, checkout_input};

#[tokio::test]
async fn full_pipeline_with_capped_percentage_coupon() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let crate_5lb = ctx
        .store
        .insert_product("Clementine Crate (5 lb)", Decimal::from(25), Decimal::ZERO, 40);
    let tote = ctx
        .store
        .insert_product("Canvas Tote", Decimal::from(18), Decimal::from(15), 10);

    // 40 * 25 = 1000 from the crates, 15 from the tote (sale price)
    ctx.carts.add_item(user, crate_5lb.id, 40).await.unwrap();
    ctx.carts.add_item(user, tote.id, 1).await.unwrap();
    let cart = ctx.carts.cart(user).await.unwrap().unwrap();
    assert_eq!(cart.total_amount, Decimal::from(1015));

    // 20% would be 203, but the cap wins
    let coupon = ctx
        .seed_coupon(
            "BIGSAVE",
            DiscountType::Percentage,
            Decimal::from(20),
            Some(Decimal::from(30)),
        )
        .await;
    let cart = ctx.carts.apply_coupon(user, "bigsave").await.unwrap();
    assert_eq!(
        cart.coupon.as_ref().map(|c| c.discount_amount),
        Some(Decimal::from(30))
    );
    assert_eq!(cart.discounted_amount, Some(Decimal::from(985)));

    let order = ctx
        .orders
        .create_order(user, checkout_input(Decimal::from(5), Decimal::from(8)))
        .await
        .unwrap();

    assert_eq!(order.total_amount, Decimal::from(1015));
    assert_eq!(order.discount_amount, Decimal::from(30));
    assert_eq!(order.grand_total, Decimal::from(998));
    assert_eq!(order.coupon_code.as_deref(), Some("BIGSAVE"));
    assert_eq!(order.items.len(), 2);

    // Stock deducted once, cart reset, redemption counted
    assert_eq!(ctx.store.stock_of(crate_5lb.id), Some(0));
    assert_eq!(ctx.store.stock_of(tote.id), Some(9));
    let cart = ctx.carts.cart(user).await.unwrap().unwrap();
    assert!(cart.is_empty());
    assert!(cart.coupon.is_none());
    assert_eq!(cart.total_amount, Decimal::ZERO);

    use clementine_checkout::store::CouponStore as _;
    let coupon = ctx.store.coupon(coupon.id).await.unwrap().unwrap();
    assert_eq!(coupon.usage_count, 1);
}

#[tokio::test]
async fn cart_lines_keep_their_snapshot_price() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let product = ctx
        .store
        .insert_product("Citrus Sampler", Decimal::from(30), Decimal::ZERO, 10);

    ctx.carts.add_item(user, product.id, 2).await.unwrap();

    // The catalog price doubles after the line was added
    ctx.store
        .set_product_price(product.id, Decimal::from(60), Decimal::ZERO);

    let cart = ctx.carts.cart(user).await.unwrap().unwrap();
    assert_eq!(cart.total_amount, Decimal::from(60));

    // And the order freezes the snapshot, not the new catalog price
    let order = ctx
        .orders
        .create_order(user, checkout_input(Decimal::ZERO, Decimal::ZERO))
        .await
        .unwrap();
    assert_eq!(order.grand_total, Decimal::from(60));
    assert_eq!(
        order.items.first().map(|item| item.unit_price),
        Some(Decimal::from(30))
    );
}

#[tokio::test]
async fn empty_cart_guards_checkout_and_coupons() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    ctx.seed_coupon("SAVE5", DiscountType::Fixed, Decimal::from(5), None)
        .await;

    let err = ctx
        .orders
        .create_order(user, checkout_input(Decimal::ZERO, Decimal::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState(_)));

    let err = ctx.carts.apply_coupon(user, "SAVE5").await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState(_)));

    // A cart emptied by checkout counts as empty again
    let product = ctx
        .store
        .insert_product("Marmalade", Decimal::from(12), Decimal::ZERO, 5);
    ctx.carts.add_item(user, product.id, 1).await.unwrap();
    ctx.orders
        .create_order(user, checkout_input(Decimal::ZERO, Decimal::ZERO))
        .await
        .unwrap();

    let err = ctx.carts.apply_coupon(user, "SAVE5").await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidState(_)));
}

#[tokio::test]
async fn coupon_survives_cart_mutations_with_fixed_discount() {
    let ctx = TestContext::new();
    let user = UserId::new(1);
    let product = ctx
        .store
        .insert_product("Gift Jar", Decimal::from(10), Decimal::ZERO, 50);

    ctx.carts.add_item(user, product.id, 10).await.unwrap();
    ctx.seed_coupon("TENOFF", DiscountType::Fixed, Decimal::from(10), None)
        .await;
    ctx.carts.apply_coupon(user, "TENOFF").await.unwrap();

    // Growing the cart does not re-evaluate the discount
    let cart = ctx.carts.add_item(user, product.id, 5).await.unwrap();
    assert_eq!(cart.total_amount, Decimal::from(150));
    assert_eq!(
        cart.coupon.as_ref().map(|c| c.discount_amount),
        Some(Decimal::from(10))
    );
    assert_eq!(cart.discounted_amount, Some(Decimal::from(140)));

    // Removing the coupon twice in a row is fine
    let cart = ctx.carts.remove_coupon(user).await.unwrap();
    assert!(cart.coupon.is_none());
    let cart = ctx.carts.remove_coupon(user).await.unwrap();
    assert!(cart.coupon.is_none());
    assert_eq!(cart.total_amount, Decimal::from(150));
}

#[tokio::test]
async fn oversell_is_rejected_across_users() {
    let ctx = TestContext::new();
    let product = ctx
        .store
        .insert_product("Last Crate", Decimal::from(25), Decimal::ZERO, 3);

    let first = UserId::new(1);
    let second = UserId::new(2);

    ctx.carts.add_item(first, product.id, 2).await.unwrap();
    ctx.carts.add_item(second, product.id, 2).await.unwrap();

    // First checkout wins the stock
    ctx.orders
        .create_order(first, checkout_input(Decimal::ZERO, Decimal::ZERO))
        .await
        .unwrap();
    assert_eq!(ctx.store.stock_of(product.id), Some(1));

    // Second checkout finds only one unit left and fails cleanly
    let err = ctx
        .orders
        .create_order(second, checkout_input(Decimal::ZERO, Decimal::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        }
    ));
    assert_eq!(ctx.store.stock_of(product.id), Some(1));
}
