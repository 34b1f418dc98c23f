//! Invoice repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, InvoiceId, OrderId};
use crate::domain::ordering::Invoice;

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// # Errors
    ///
    /// - `Conflict` if the invoice number is taken
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError>;

    /// Oldest first.
    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Invoice>, DomainError>;
}
