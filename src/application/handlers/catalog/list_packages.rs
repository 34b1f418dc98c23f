//! ListPackagesHandler - Query handler for the storefront and admin catalog.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::catalog::{Category, Package};
use crate::domain::SalesError;
use crate::ports::CatalogReader;

/// Query for packages grouped by category.
#[derive(Debug, Clone, Default)]
pub struct ListPackagesQuery {
    /// Admin listings include inactive packages and hidden categories.
    pub include_inactive: bool,
}

/// One category with its packages in display order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPackages {
    pub category: Category,
    pub packages: Vec<Package>,
}

pub struct ListPackagesHandler {
    catalog: Arc<dyn CatalogReader>,
}

impl ListPackagesHandler {
    pub fn new(catalog: Arc<dyn CatalogReader>) -> Self {
        Self { catalog }
    }

    pub async fn handle(&self, query: ListPackagesQuery) -> Result<Vec<CategoryPackages>, SalesError> {
        let categories = self.catalog.list_categories().await?;
        let mut packages = self.catalog.list_packages(!query.include_inactive).await?;

        let mut groups = Vec::with_capacity(categories.len());
        for category in categories {
            if !query.include_inactive && !category.is_visible() {
                continue;
            }
            let (mine, rest): (Vec<_>, Vec<_>) =
                packages.into_iter().partition(|p| p.category_id == category.id);
            packages = rest;
            if mine.is_empty() {
                continue;
            }
            groups.push(CategoryPackages {
                category,
                packages: mine,
            });
        }
        groups.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::Fixture;
    use crate::ports::CatalogRepository;

    #[tokio::test]
    async fn groups_active_packages_by_category() {
        let fx = Fixture::new().await;
        let handler = ListPackagesHandler::new(fx.store.clone());

        let groups = handler.handle(ListPackagesQuery::default()).await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category.name, "Shared Hosting");
        assert_eq!(groups[0].packages[0].slug, "business");
    }

    #[tokio::test]
    async fn inactive_packages_only_show_for_admins() {
        let fx = Fixture::new().await;
        let mut package = fx.package.clone();
        package.set_active(false);
        fx.store.update_package(&package).await.unwrap();
        let handler = ListPackagesHandler::new(fx.store.clone());

        let storefront = handler.handle(ListPackagesQuery::default()).await.unwrap();
        assert!(storefront.is_empty());

        let admin = handler
            .handle(ListPackagesQuery {
                include_inactive: true,
            })
            .await
            .unwrap();
        assert_eq!(admin[0].packages.len(), 1);
    }
}
