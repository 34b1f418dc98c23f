//! Shared application state and handler factories.

use std::sync::Arc;

use crate::application::handlers::catalog::{
    BulkPackageActionHandler, CreateCategoryHandler, CreateFeatureHandler, CreatePackageHandler,
    DeleteCategoryHandler, DeleteFeatureHandler, DeletePackageHandler, GetPackageHandler,
    ListFeaturesHandler, ListPackagesHandler, UpdateCategoryHandler, UpdateFeatureHandler,
    UpdatePackageHandler,
};
use crate::application::handlers::checkout::{CheckoutOptions, ProcessCheckoutHandler};
use crate::application::handlers::customization::{
    BulkSetLimitsHandler, CalculatePriceHandler, ListLimitsHandler, PreviewCustomizationHandler,
    RemoveLimitHandler, SetLimitHandler, ValidateCustomizationHandler,
};
use crate::application::handlers::order::{
    CancelOrderHandler, GenerateInvoiceHandler, GetOrderHandler, InvoiceOptions, ListOrdersHandler,
};
use crate::application::handlers::payment::{
    GetOrderPaymentHandler, GetPaymentHandler, HandleGatewayWebhookHandler, ListPaymentsHandler,
    PaymentGateways, PaymentOptions, PaymentStatsHandler, ProcessPaymentHandler,
    RecordManualPaymentHandler, RefundPaymentHandler,
};
use crate::application::OrderLocks;
use crate::ports::{
    AuditLog, CatalogReader, CatalogRepository, InvoiceRepository, LimitRepository,
    NumberGenerator, OrderRepository, PaymentRepository, WebhookVerifier,
};

/// Everything a request handler may need.
///
/// Cloned per request; all dependencies are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogReader>,
    pub catalog_admin: Arc<dyn CatalogRepository>,
    pub limits: Arc<dyn LimitRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub numbers: Arc<dyn NumberGenerator>,
    pub audit: Arc<dyn AuditLog>,
    pub gateways: PaymentGateways,
    pub webhook_verifier: Arc<dyn WebhookVerifier>,
    pub locks: Arc<OrderLocks>,
    pub checkout_options: CheckoutOptions,
    pub payment_options: PaymentOptions,
    pub invoice_options: InvoiceOptions,
}

impl AppState {
    /// Builds state over one store implementing every repository port.
    pub fn with_store<S>(
        store: Arc<S>,
        numbers: Arc<dyn NumberGenerator>,
        audit: Arc<dyn AuditLog>,
        gateways: PaymentGateways,
        webhook_verifier: Arc<dyn WebhookVerifier>,
    ) -> Self
    where
        S: CatalogReader
            + CatalogRepository
            + LimitRepository
            + OrderRepository
            + PaymentRepository
            + InvoiceRepository
            + 'static,
    {
        Self {
            catalog: store.clone(),
            catalog_admin: store.clone(),
            limits: store.clone(),
            orders: store.clone(),
            payments: store.clone(),
            invoices: store,
            numbers,
            audit,
            gateways,
            webhook_verifier,
            locks: Arc::new(OrderLocks::new()),
            checkout_options: CheckoutOptions::default(),
            payment_options: PaymentOptions::default(),
            invoice_options: InvoiceOptions::default(),
        }
    }

    pub fn with_options(
        mut self,
        checkout: CheckoutOptions,
        payment: PaymentOptions,
        invoice: InvoiceOptions,
    ) -> Self {
        self.checkout_options = checkout;
        self.payment_options = payment;
        self.invoice_options = invoice;
        self
    }

    // ── storefront ─────────────────────────────────────────────────────────

    pub fn list_packages_handler(&self) -> ListPackagesHandler {
        ListPackagesHandler::new(self.catalog.clone())
    }

    pub fn get_package_handler(&self) -> GetPackageHandler {
        GetPackageHandler::new(self.catalog.clone())
    }

    pub fn calculate_price_handler(&self) -> CalculatePriceHandler {
        CalculatePriceHandler::new(self.catalog.clone(), self.checkout_options.tax_rate)
    }

    pub fn preview_customization_handler(&self) -> PreviewCustomizationHandler {
        PreviewCustomizationHandler::new(self.catalog.clone(), self.limits.clone())
    }

    pub fn validate_customization_handler(&self) -> ValidateCustomizationHandler {
        ValidateCustomizationHandler::new(self.catalog.clone(), self.limits.clone())
    }

    pub fn checkout_handler(&self) -> ProcessCheckoutHandler {
        ProcessCheckoutHandler::new(
            self.catalog.clone(),
            self.limits.clone(),
            self.orders.clone(),
            self.numbers.clone(),
            self.audit.clone(),
            self.checkout_options.clone(),
        )
    }

    pub fn process_payment_handler(&self) -> ProcessPaymentHandler {
        ProcessPaymentHandler::new(
            self.orders.clone(),
            self.payments.clone(),
            self.gateways.clone(),
            self.locks.clone(),
            self.audit.clone(),
            self.payment_options.clone(),
        )
    }

    pub fn order_payment_handler(&self) -> GetOrderPaymentHandler {
        GetOrderPaymentHandler::new(self.orders.clone(), self.payments.clone())
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.payments.clone(),
            self.orders.clone(),
            self.locks.clone(),
            self.audit.clone(),
        )
    }

    // ── catalog administration ─────────────────────────────────────────────

    pub fn create_category_handler(&self) -> CreateCategoryHandler {
        CreateCategoryHandler::new(self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn update_category_handler(&self) -> UpdateCategoryHandler {
        UpdateCategoryHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn delete_category_handler(&self) -> DeleteCategoryHandler {
        DeleteCategoryHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn list_features_handler(&self) -> ListFeaturesHandler {
        ListFeaturesHandler::new(self.catalog.clone())
    }

    pub fn create_feature_handler(&self) -> CreateFeatureHandler {
        CreateFeatureHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn update_feature_handler(&self) -> UpdateFeatureHandler {
        UpdateFeatureHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn delete_feature_handler(&self) -> DeleteFeatureHandler {
        DeleteFeatureHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn create_package_handler(&self) -> CreatePackageHandler {
        CreatePackageHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn update_package_handler(&self) -> UpdatePackageHandler {
        UpdatePackageHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn delete_package_handler(&self) -> DeletePackageHandler {
        DeletePackageHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    pub fn bulk_package_handler(&self) -> BulkPackageActionHandler {
        BulkPackageActionHandler::new(self.catalog.clone(), self.catalog_admin.clone(), self.audit.clone())
    }

    // ── limits ─────────────────────────────────────────────────────────────

    pub fn set_limit_handler(&self) -> SetLimitHandler {
        SetLimitHandler::new(self.catalog.clone(), self.limits.clone(), self.audit.clone())
    }

    pub fn remove_limit_handler(&self) -> RemoveLimitHandler {
        RemoveLimitHandler::new(self.limits.clone(), self.audit.clone())
    }

    pub fn list_limits_handler(&self) -> ListLimitsHandler {
        ListLimitsHandler::new(self.limits.clone())
    }

    pub fn bulk_limits_handler(&self) -> BulkSetLimitsHandler {
        BulkSetLimitsHandler::new(self.catalog.clone(), self.limits.clone(), self.audit.clone())
    }

    // ── orders and payments ────────────────────────────────────────────────

    pub fn list_orders_handler(&self) -> ListOrdersHandler {
        ListOrdersHandler::new(self.orders.clone())
    }

    pub fn get_order_handler(&self) -> GetOrderHandler {
        GetOrderHandler::new(self.orders.clone(), self.payments.clone(), self.invoices.clone())
    }

    pub fn cancel_order_handler(&self) -> CancelOrderHandler {
        CancelOrderHandler::new(self.orders.clone(), self.locks.clone(), self.audit.clone())
    }

    pub fn generate_invoice_handler(&self) -> GenerateInvoiceHandler {
        GenerateInvoiceHandler::new(
            self.orders.clone(),
            self.invoices.clone(),
            self.catalog.clone(),
            self.numbers.clone(),
            self.locks.clone(),
            self.audit.clone(),
            self.invoice_options.clone(),
        )
    }

    pub fn list_payments_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.payments.clone())
    }

    pub fn get_payment_handler(&self) -> GetPaymentHandler {
        GetPaymentHandler::new(self.payments.clone())
    }

    pub fn payment_stats_handler(&self) -> PaymentStatsHandler {
        PaymentStatsHandler::new(self.orders.clone(), self.payments.clone())
    }

    pub fn refund_payment_handler(&self) -> RefundPaymentHandler {
        RefundPaymentHandler::new(
            self.orders.clone(),
            self.payments.clone(),
            self.locks.clone(),
            self.audit.clone(),
        )
    }

    pub fn manual_payment_handler(&self) -> RecordManualPaymentHandler {
        RecordManualPaymentHandler::new(
            self.orders.clone(),
            self.payments.clone(),
            self.locks.clone(),
            self.audit.clone(),
        )
    }
}
