use crate::application::access::{authorize, Rule};
use crate::errors::AppError;
use pizzeria_types::domain::order::{NewOrderItem, Order};
use pizzeria_types::domain::user::User;
use pizzeria_types::ports::{OrderRepository, UserRepository};

/// Order use cases. An existing order or item is loaded (NotFound) before
/// the caller is checked against it (Forbidden). Creation checks the caller
/// first so unknown user ids are only reported to admins.
pub struct OrderService<R: UserRepository + OrderRepository> {
    repo: R,
}

impl<R: UserRepository + OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create_order(&self, owner_user_id: i64, caller: &User) -> Result<Order, AppError> {
        authorize(caller, Rule::AdminOrOwner(owner_user_id))?;
        if self.repo.get_user(owner_user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user {}", owner_user_id)));
        }
        let order = self.repo.create(owner_user_id).await?;
        tracing::info!(order_id = order.id, owner_user_id, "order created");
        Ok(order)
    }

    async fn load(&self, id: i64) -> Result<Order, AppError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", id)))
    }

    pub async fn add_item(
        &self,
        order_id: i64,
        item: NewOrderItem,
        caller: &User,
    ) -> Result<Order, AppError> {
        let order = self.load(order_id).await?;
        authorize(caller, Rule::AdminOrOwner(order.owner_user_id))?;
        let updated = self
            .repo
            .add_item(order_id, item)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))?;
        tracing::info!(order_id, total_price = updated.total_price, "item added");
        Ok(updated)
    }

    pub async fn cancel_order(&self, order_id: i64, caller: &User) -> Result<Order, AppError> {
        let order = self.load(order_id).await?;
        authorize(caller, Rule::AdminOrOwner(order.owner_user_id))?;
        let cancelled = self
            .repo
            .cancel(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))?;
        tracing::info!(order_id, by = caller.id, "order cancelled");
        Ok(cancelled)
    }

    pub async fn remove_item(&self, item_id: i64, caller: &User) -> Result<Order, AppError> {
        let order = self
            .repo
            .find_by_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("item {}", item_id)))?;
        authorize(caller, Rule::AdminOrOwner(order.owner_user_id))?;
        let updated = self
            .repo
            .remove_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("item {}", item_id)))?;
        tracing::info!(
            order_id = updated.id,
            item_id,
            total_price = updated.total_price,
            "item removed"
        );
        Ok(updated)
    }

    pub async fn list_orders(&self, caller: &User) -> Result<Vec<Order>, AppError> {
        authorize(caller, Rule::AdminOnly)?;
        Ok(self.repo.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pizzeria_repo::memory::InMemoryRepo;
    use pizzeria_types::domain::order::OrderStatus;
    use pizzeria_types::domain::user::NewUser;

    async fn seed_user(repo: &InMemoryRepo, email: &str, admin: bool) -> User {
        repo.create_user(
            NewUser::new("Someone".into(), email.into(), "h".into(), true, admin).unwrap(),
        )
        .await
        .unwrap()
    }

    fn pizza(quantity: i64, unit_price: f64) -> NewOrderItem {
        NewOrderItem::new(quantity, "mozzarella".into(), "large".into(), unit_price).unwrap()
    }

    #[tokio::test]
    async fn total_tracks_item_changes() {
        let repo = InMemoryRepo::new();
        let owner = seed_user(&repo, "owner@example.com", false).await;
        let svc = OrderService::new(repo.clone());

        let order = svc.create_order(owner.id, &owner).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, 0.0);

        svc.add_item(order.id, pizza(2, 10.0), &owner).await.unwrap();
        let order = svc.add_item(order.id, pizza(1, 5.0), &owner).await.unwrap();
        assert_eq!(order.total_price, 25.0);

        let second = order.items[1].id;
        let order = svc.remove_item(second, &owner).await.unwrap();
        assert_eq!(order.total_price, 20.0);
        assert_eq!(order.items.len(), 1);

        let missing = svc.remove_item(second, &owner).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_is_owner_or_admin() {
        let repo = InMemoryRepo::new();
        let a = seed_user(&repo, "a@example.com", false).await;
        let b = seed_user(&repo, "b@example.com", false).await;
        let admin = seed_user(&repo, "admin@example.com", true).await;
        let svc = OrderService::new(repo.clone());

        let order = svc.create_order(b.id, &b).await.unwrap();
        let order = svc.add_item(order.id, pizza(3, 4.0), &b).await.unwrap();

        let denied = svc.cancel_order(order.id, &a).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let cancelled = svc.cancel_order(order.id, &b).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.items, order.items);
        assert_eq!(cancelled.total_price, order.total_price);

        // already cancelled: idempotent
        let again = svc.cancel_order(order.id, &admin).await.unwrap();
        assert_eq!(again, cancelled);

        let late = svc.add_item(order.id, pizza(1, 1.0), &b).await;
        assert!(matches!(late, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn foreign_item_and_order_access_is_forbidden() {
        let repo = InMemoryRepo::new();
        let a = seed_user(&repo, "a@example.com", false).await;
        let b = seed_user(&repo, "b@example.com", false).await;
        let admin = seed_user(&repo, "admin@example.com", true).await;
        let svc = OrderService::new(repo.clone());

        let order = svc.create_order(b.id, &b).await.unwrap();
        let order = svc.add_item(order.id, pizza(1, 9.0), &b).await.unwrap();
        let item_id = order.items[0].id;

        assert!(matches!(
            svc.add_item(order.id, pizza(1, 1.0), &a).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            svc.remove_item(item_id, &a).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            svc.create_order(b.id, &a).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(svc.list_orders(&a).await, Err(AppError::Forbidden(_))));

        let by_admin = svc.remove_item(item_id, &admin).await.unwrap();
        assert!(by_admin.items.is_empty());
        assert_eq!(by_admin.total_price, 0.0);
        assert_eq!(svc.list_orders(&admin).await.unwrap().len(), 1);
        svc.create_order(a.id, &admin).await.unwrap();
    }

    #[tokio::test]
    async fn not_found_paths() {
        let repo = InMemoryRepo::new();
        let admin = seed_user(&repo, "admin@example.com", true).await;
        let svc = OrderService::new(repo.clone());

        assert!(matches!(svc.create_order(404, &admin).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.cancel_order(404, &admin).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            svc.add_item(404, pizza(1, 1.0), &admin).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(svc.remove_item(404, &admin).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_resource_wins_over_forbidden() {
        let repo = InMemoryRepo::new();
        let nobody = seed_user(&repo, "nobody@example.com", false).await;
        let svc = OrderService::new(repo.clone());
        assert!(matches!(svc.cancel_order(77, &nobody).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.remove_item(77, &nobody).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_order_does_not_reveal_user_ids_to_non_admins() {
        let repo = InMemoryRepo::new();
        let plain = seed_user(&repo, "plain@example.com", false).await;
        let other = seed_user(&repo, "other@example.com", false).await;
        let admin = seed_user(&repo, "admin@example.com", true).await;
        let svc = OrderService::new(repo.clone());

        // unknown and existing foreign owners look the same
        assert!(matches!(svc.create_order(404, &plain).await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            svc.create_order(other.id, &plain).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(svc.create_order(404, &admin).await, Err(AppError::NotFound(_))));
        assert!(repo.list().await.unwrap().is_empty());
    }
}
