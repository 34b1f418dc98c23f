//! HTTP DTOs for the storefront and admin endpoints.
//!
//! Request types deserialize the JSON bodies and convert into application
//! commands. Responses reuse domain types wherever they already serialize.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::handlers::catalog::{BulkPackageAction, CategoryFields};
use crate::domain::catalog::{BillingCycle, FeatureDraft, FeatureKind, PackageDraft, PackageFeature};
use crate::domain::customization::CustomizationItem;
use crate::domain::foundation::{
    CategoryId, FeatureId, Money, OrderId, PackageId, PaymentId, Percentage, UserId,
};
use crate::domain::ordering::{Gateway, OrderStatus, PaymentStatus};
use crate::ports::{OrderFilter, PaymentFilter};

// ════════════════════════════════════════════════════════════════════════════════
// Storefront requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of the price, customize and validate endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomizationRequest {
    #[serde(default)]
    pub customization: Vec<CustomizationItem>,
    #[serde(default)]
    pub billing_cycle: Option<BillingCycle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub package_id: PackageId,
    #[serde(default)]
    pub customization: Vec<CustomizationItem>,
    #[serde(default)]
    pub billing_cycle: Option<BillingCycle>,
    /// Free-form fields stored on the order (domain name, notes for provisioning).
    #[serde(default)]
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub gateway: Gateway,
    /// Gateway-specific input such as a Stripe payment method id.
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Storefront responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub order_number: String,
    pub total_amount: Money,
    pub payment_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub success: bool,
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Catalog admin requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl From<CategoryRequest> for CategoryFields {
    fn from(req: CategoryRequest) -> Self {
        Self {
            name: req.name,
            slug: req.slug,
            description: req.description,
            is_active: req.is_active,
            display_order: req.display_order,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureRequest {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Tagged by `type`: number (with optional min/max), boolean, dropdown, text.
    pub kind: FeatureKind,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub base_price: Money,
    #[serde(default = "default_true")]
    pub is_customizable: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl From<FeatureRequest> for FeatureDraft {
    fn from(req: FeatureRequest) -> Self {
        Self {
            category_id: req.category_id,
            name: req.name,
            slug: req.slug,
            description: req.description,
            kind: req.kind,
            default_value: req.default_value,
            base_price: req.base_price,
            is_customizable: req.is_customizable,
            is_active: req.is_active,
            display_order: req.display_order,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageRequest {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: Money,
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub setup_fee: Money,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "no_discount")]
    pub discount: Percentage,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub max_renewals: Option<u32>,
    #[serde(default)]
    pub features: Vec<PackageFeature>,
}

impl From<PackageRequest> for PackageDraft {
    fn from(req: PackageRequest) -> Self {
        Self {
            category_id: req.category_id,
            name: req.name,
            slug: req.slug,
            description: req.description,
            base_price: req.base_price,
            billing_cycle: req.billing_cycle,
            setup_fee: req.setup_fee,
            is_popular: req.is_popular,
            is_active: req.is_active,
            discount: req.discount,
            display_order: req.display_order,
            max_renewals: req.max_renewals,
            features: req.features,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkPackageRequest {
    pub action: BulkPackageAction,
    pub package_ids: Vec<PackageId>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Limit admin requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct SetLimitRequest {
    pub feature_id: FeatureId,
    pub max_value: Decimal,
    #[serde(default)]
    pub is_enforced: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkLimitsRequest {
    pub user_ids: Vec<UserId>,
    pub feature_id: FeatureId,
    pub max_value: Decimal,
}

// ════════════════════════════════════════════════════════════════════════════════
// Order and payment admin requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListParams {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl From<OrderListParams> for OrderFilter {
    fn from(params: OrderListParams) -> Self {
        Self {
            status: params.status,
            user_id: params.user_id,
            limit: params.limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentListParams {
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub gateway: Option<Gateway>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl From<PaymentListParams> for PaymentFilter {
    fn from(params: PaymentListParams) -> Self {
        Self {
            status: params.status,
            gateway: params.gateway,
            limit: params.limit,
        }
    }
}

/// Payment recorded by an admin outside any gateway flow.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualPaymentRequest {
    pub order_id: OrderId,
    pub gateway: Gateway,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse<T: Serialize> {
    pub created: bool,
    pub invoice: T,
}

fn default_true() -> bool {
    true
}

fn no_discount() -> Percentage {
    Percentage::ZERO
}
