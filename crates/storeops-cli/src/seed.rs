//! Demo data for local development: a spread of customer profiles across the
//! segment spectrum, plus coupons with redemption history.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use storeops_core::{generate_code, CouponKind};

struct SeedCustomer {
    email: &'static str,
    name: &'static str,
    city: &'static str,
    // (days_ago, total, status)
    orders: &'static [(i64, i64, &'static str)],
}

const CUSTOMERS: &[SeedCustomer] = &[
    SeedCustomer {
        email: "maria.alvarez@example.com",
        name: "Maria Alvarez",
        city: "Austin",
        orders: &[
            (350, 1_200, "COMPLETED"),
            (240, 950, "COMPLETED"),
            (130, 1_400, "COMPLETED"),
            (60, 800, "COMPLETED"),
            (12, 1_100, "COMPLETED"),
        ],
    },
    SeedCustomer {
        email: "dev.patel@example.com",
        name: "Dev Patel",
        city: "Chicago",
        orders: &[(300, 450, "COMPLETED"), (150, 380, "COMPLETED"), (15, 90, "COMPLETED")],
    },
    SeedCustomer {
        email: "lena.koch@example.com",
        name: "Lena Koch",
        city: "Berlin",
        orders: &[(200, 2_400, "COMPLETED"), (120, 1_900, "COMPLETED")],
    },
    SeedCustomer {
        email: "sam.ortiz@example.com",
        name: "Sam Ortiz",
        city: "Denver",
        orders: &[(400, 600, "COMPLETED"), (380, 550, "COMPLETED"), (360, 300, "COMPLETED")],
    },
    SeedCustomer {
        email: "jo.nakamura@example.com",
        name: "Jo Nakamura",
        city: "Seattle",
        orders: &[(8, 220, "COMPLETED")],
    },
    SeedCustomer {
        email: "window.shopper@example.com",
        name: "Quinn Harper",
        city: "Portland",
        orders: &[],
    },
    SeedCustomer {
        email: "refunder@example.com",
        name: "Alex Reyes",
        city: "Boston",
        orders: &[(45, 700, "REFUNDED"), (30, 150, "COMPLETED")],
    },
];

pub async fn run(pool: &PgPool) -> anyhow::Result<()> {
    let now = Utc::now();

    let mut first_order_id = None;
    for seed in CUSTOMERS {
        let customer = storeops_db::create_customer(
            pool,
            seed.email,
            seed.name,
            None,
            Some(seed.city),
            Some("US"),
        )
        .await?;

        for (days_ago, total, status) in seed.orders {
            let order = storeops_db::create_order(
                pool,
                customer.id,
                Decimal::from(*total),
                status,
                now - Duration::days(*days_ago),
            )
            .await?;
            first_order_id.get_or_insert(order.id);
        }
    }

    let summer = storeops_db::create_coupon(
        pool,
        &storeops_db::NewCoupon {
            code: "SUMMER10",
            description: Some("10% off summer promotion"),
            kind: CouponKind::Percentage,
            value: Decimal::from(10),
            min_purchase: Decimal::from(50),
            max_discount: Some(Decimal::from(100)),
            usage_limit: Some(100),
            valid_from: now - Duration::days(30),
            valid_until: now + Duration::days(60),
            is_active: true,
        },
    )
    .await?;

    let freeship = storeops_db::create_coupon(
        pool,
        &storeops_db::NewCoupon {
            code: &generate_code("SHIP"),
            description: Some("Free shipping over $25"),
            kind: CouponKind::FreeShipping,
            value: Decimal::ZERO,
            min_purchase: Decimal::from(25),
            max_discount: None,
            usage_limit: None,
            valid_from: now - Duration::days(10),
            valid_until: now + Duration::days(90),
            is_active: true,
        },
    )
    .await?;

    if let Some(order_id) = first_order_id {
        storeops_db::record_redemption(
            pool,
            summer.id,
            order_id,
            Decimal::from(1_200),
            Decimal::from(100),
        )
        .await?;
        storeops_db::increment_usage(pool, summer.public_id).await?;
    }

    let campaign = storeops_db::create_campaign(
        pool,
        "Summer Hardware Sale",
        Some("Seasonal push across the storefront"),
        "ACTIVE",
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(2025, 8, 31).unwrap_or_default(),
    )
    .await?;
    storeops_db::attach_coupon(pool, campaign.id, summer.id).await?;
    storeops_db::attach_coupon(pool, campaign.id, freeship.id).await?;
    storeops_db::create_event(
        pool,
        campaign.id,
        "Launch newsletter",
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap_or_default(),
        Some("Announce SUMMER10 to the full list"),
    )
    .await?;

    tracing::info!(
        customers = CUSTOMERS.len(),
        coupons = 2,
        "seeded demo data"
    );
    println!("seeded {} customers, 2 coupons, 1 campaign", CUSTOMERS.len());
    Ok(())
}
