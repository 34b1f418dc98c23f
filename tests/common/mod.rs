//! Shared setup for the integration tests: an in-memory store seeded with
//! one category, two features and one package.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;

use hosting_sales::adapters::http::AppState;
use hosting_sales::adapters::{
    HmacWebhookVerifier, InMemorySalesStore, MockPaymentGateway, RecordingAuditLog,
    SequentialNumberGenerator,
};
use hosting_sales::application::handlers::payment::PaymentGateways;
use hosting_sales::domain::catalog::{
    BillingCycle, Category, Feature, FeatureDraft, FeatureKind, Package, PackageDraft,
    PackageFeature,
};
use hosting_sales::domain::customization::{CustomizationItem, CustomizationLimit};
use hosting_sales::domain::foundation::{CategoryId, Money, Percentage, UserId};
use hosting_sales::domain::ordering::Gateway;
use hosting_sales::ports::{CatalogRepository, LimitRepository};

pub const BKASH_SECRET: &str = "whsec_bkash_test";

pub struct Harness {
    pub store: Arc<InMemorySalesStore>,
    pub audit: Arc<RecordingAuditLog>,
    /// Shares its state with the copy registered in `state`.
    pub stripe: MockPaymentGateway,
    pub bkash: MockPaymentGateway,
    pub state: AppState,
    /// "Extra Storage", 0.50 per GB on the package.
    pub storage: Feature,
    /// "Dedicated IP", 5.00 on the package.
    pub dedicated_ip: Feature,
    /// "Business", 99.00 monthly.
    pub package: Package,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(InMemorySalesStore::new());
        let category = Category::new("Shared Hosting", "shared-hosting", None, 1).unwrap();
        store.save_category(&category).await.unwrap();

        let storage = Feature::create(draft(
            &category,
            "Extra Storage",
            "extra-storage",
            FeatureKind::Number {
                min: Some(Decimal::ZERO),
                max: Some(Decimal::from(1000)),
            },
        ))
        .unwrap();
        let dedicated_ip = Feature::create(draft(
            &category,
            "Dedicated IP",
            "dedicated-ip",
            FeatureKind::Boolean,
        ))
        .unwrap();
        store.save_feature(&storage).await.unwrap();
        store.save_feature(&dedicated_ip).await.unwrap();

        let package = Package::create(PackageDraft {
            category_id: category.id,
            name: "Business".to_string(),
            slug: "business".to_string(),
            description: None,
            base_price: Money::from_major(99),
            billing_cycle: BillingCycle::Monthly,
            setup_fee: Money::ZERO,
            is_popular: false,
            is_active: true,
            discount: Percentage::ZERO,
            display_order: 1,
            max_renewals: None,
            features: vec![
                PackageFeature::new(storage.id, Some("10".into()), Money::from_cents(50)),
                PackageFeature::new(dedicated_ip.id, None, Money::from_major(5)),
            ],
        })
        .unwrap();
        store.save_package(&package).await.unwrap();

        let audit = Arc::new(RecordingAuditLog::new());
        let stripe = MockPaymentGateway::new(Gateway::Stripe);
        let bkash = MockPaymentGateway::new(Gateway::Bkash);
        let gateways = PaymentGateways::new()
            .register(Arc::new(stripe.clone()))
            .register(Arc::new(bkash.clone()));
        let verifier = HmacWebhookVerifier::new()
            .with_secret(Gateway::Bkash, SecretString::new(BKASH_SECRET.into()));

        let state = AppState::with_store(
            store.clone(),
            Arc::new(SequentialNumberGenerator::new()),
            audit.clone(),
            gateways,
            Arc::new(verifier),
        );

        Self {
            store,
            audit,
            stripe,
            bkash,
            state,
            storage,
            dedicated_ip,
            package,
        }
    }

    /// Enforced storage quota of `max` GB for `user`.
    pub async fn limit_storage(&self, user: &UserId, max: i64) -> CustomizationLimit {
        let limit =
            CustomizationLimit::new(user.clone(), self.storage.id, Decimal::from(max), true).unwrap();
        self.store.upsert_limit(&limit).await.unwrap()
    }

    pub fn storage_item(&self, gb: i64) -> CustomizationItem {
        CustomizationItem {
            feature_id: self.storage.id,
            value: serde_json::json!(gb),
        }
    }
}

impl Harness {
    /// "Bandwidth", a number feature with no upper bound, alone on a
    /// package priced 0.01 per unit.
    pub async fn metered_package(&self) -> (Feature, Package) {
        let mut bandwidth_draft = draft_in(self.package.category_id, "Bandwidth", "bandwidth");
        bandwidth_draft.kind = FeatureKind::Number {
            min: None,
            max: None,
        };
        let bandwidth = Feature::create(bandwidth_draft).unwrap();
        self.store.save_feature(&bandwidth).await.unwrap();

        let package = Package::create(PackageDraft {
            category_id: self.package.category_id,
            name: "Metered".to_string(),
            slug: "metered".to_string(),
            description: None,
            base_price: Money::ZERO,
            billing_cycle: BillingCycle::Monthly,
            setup_fee: Money::ZERO,
            is_popular: false,
            is_active: true,
            discount: Percentage::ZERO,
            display_order: 2,
            max_renewals: None,
            features: vec![PackageFeature::new(bandwidth.id, None, Money::from_cents(1))],
        })
        .unwrap();
        self.store.save_package(&package).await.unwrap();
        (bandwidth, package)
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn draft(category: &Category, name: &str, slug: &str, kind: FeatureKind) -> FeatureDraft {
    FeatureDraft {
        kind,
        ..draft_in(category.id, name, slug)
    }
}

fn draft_in(category_id: CategoryId, name: &str, slug: &str) -> FeatureDraft {
    FeatureDraft {
        category_id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        kind: FeatureKind::Text,
        default_value: None,
        base_price: Money::ZERO,
        is_customizable: true,
        is_active: true,
        display_order: 0,
    }
}
