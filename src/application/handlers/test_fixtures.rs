//! Seeded in-memory catalog shared by handler tests.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::adapters::audit::RecordingAuditLog;
use crate::adapters::memory::InMemorySalesStore;
use crate::domain::catalog::{
    BillingCycle, Category, Feature, FeatureDraft, FeatureKind, Package, PackageDraft,
    PackageFeature,
};
use crate::domain::customization::{CustomizationItem, CustomizationLimit};
use crate::domain::foundation::{Money, Percentage, UserId};
use crate::ports::{CatalogRepository, LimitRepository};

pub struct Fixture {
    pub store: Arc<InMemorySalesStore>,
    pub audit: Arc<RecordingAuditLog>,
    pub category: Category,
    /// Number feature "Extra Storage", 0.50 per GB on the package.
    pub storage: Feature,
    /// Boolean feature "Dedicated IP", 5.00 on the package.
    pub dedicated_ip: Feature,
    /// 99.00 monthly, no setup fee.
    pub package: Package,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemorySalesStore::new());
        let category = Category::new("Shared Hosting", "shared-hosting", None, 1).unwrap();
        store.save_category(&category).await.unwrap();

        let storage = Feature::create(feature_draft(
            &category,
            "Extra Storage",
            "extra-storage",
            FeatureKind::Number {
                min: Some(Decimal::ZERO),
                max: Some(Decimal::from(1000)),
            },
        ))
        .unwrap();
        let dedicated_ip = Feature::create(feature_draft(
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
            description: Some("For growing sites".to_string()),
            base_price: Money::from_major(99),
            billing_cycle: BillingCycle::Monthly,
            setup_fee: Money::ZERO,
            is_popular: true,
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

        Self {
            store,
            audit: Arc::new(RecordingAuditLog::new()),
            category,
            storage,
            dedicated_ip,
            package,
        }
    }

    /// Fresh enforced storage quota for `user`.
    pub async fn limit_storage(&self, user: &UserId, max: i64, current: i64) -> CustomizationLimit {
        let mut limit =
            CustomizationLimit::new(user.clone(), self.storage.id, Decimal::from(max), true).unwrap();
        limit.current_value = Decimal::from(current);
        self.store.upsert_limit(&limit).await.unwrap()
    }

    pub fn storage_item(&self, gb: i64) -> CustomizationItem {
        CustomizationItem {
            feature_id: self.storage.id,
            value: serde_json::json!(gb),
        }
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn feature_draft(category: &Category, name: &str, slug: &str, kind: FeatureKind) -> FeatureDraft {
    FeatureDraft {
        category_id: category.id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        kind,
        default_value: None,
        base_price: Money::ZERO,
        is_customizable: true,
        is_active: true,
        display_order: 0,
    }
}
