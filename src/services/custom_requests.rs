use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{CustomRequest, CustomRequestStatus, CustomerInfo},
    notifications::{messages, NotificationDispatcher},
    store::{keys, KeyLocks, KeyValueStoreExt, SharedStore},
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomRequest {
    #[validate]
    pub customer_info: CustomerInfo,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub budget: Option<Decimal>,
}

/// Quote negotiation for bespoke orders.
///
/// `Submitted → Quoted → Approved | Rejected`, with staff able to reject or
/// cancel any live request. Terminal requests accept no further transition.
#[derive(Clone)]
pub struct CustomRequestDesk {
    store: SharedStore,
    locks: KeyLocks,
    notifier: NotificationDispatcher,
}

impl CustomRequestDesk {
    pub fn new(store: SharedStore, locks: KeyLocks, notifier: NotificationDispatcher) -> Self {
        Self {
            store,
            locks,
            notifier,
        }
    }

    async fn load(&self, id: Uuid) -> Result<CustomRequest, ServiceError> {
        self.store
            .get_json(&keys::custom_request(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Custom request {} not found", id)))
    }

    async fn save(&self, request: &CustomRequest) -> Result<(), ServiceError> {
        self.store
            .set_json(&keys::custom_request(request.id), request)
            .await?;
        Ok(())
    }

    /// Loads under the key lock, checks the current status and applies `change`.
    async fn transition<F>(
        &self,
        id: Uuid,
        allowed: &[CustomRequestStatus],
        change: F,
    ) -> Result<CustomRequest, ServiceError>
    where
        F: FnOnce(&mut CustomRequest),
    {
        let key = keys::custom_request(id);
        let _guard = self.locks.lock(&key).await;
        let mut request = self.load(id).await?;

        if request.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Custom request is already {}",
                request.status
            )));
        }
        if !allowed.contains(&request.status) {
            return Err(ServiceError::Conflict(format!(
                "Custom request cannot change while {}",
                request.status
            )));
        }

        let from = request.status;
        change(&mut request);
        request.updated_at = Utc::now();
        self.save(&request).await?;
        info!(request_id = %id, %from, to = %request.status, "custom request updated");
        Ok(request)
    }

    #[instrument(skip(self, input))]
    pub async fn submit(&self, input: NewCustomRequest) -> Result<CustomRequest, ServiceError> {
        input.validate()?;
        if input.budget.map_or(false, |b| b < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Budget cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let request = CustomRequest {
            id: Uuid::new_v4(),
            customer_info: input.customer_info,
            description: input.description,
            budget: input.budget,
            status: CustomRequestStatus::Submitted,
            quoted_price: None,
            admin_notes: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.save(&request).await?;
        info!(request_id = %request.id, "custom request submitted");

        self.notifier
            .dispatch_all(
                "custom_request_submitted",
                messages::custom_request_submitted(&request, self.notifier.admin()),
            )
            .await;
        Ok(request)
    }

    #[instrument(skip(self, notes))]
    pub async fn quote(
        &self,
        id: Uuid,
        price: Decimal,
        notes: Option<String>,
    ) -> Result<CustomRequest, ServiceError> {
        if price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quoted price must be greater than zero".to_string(),
            ));
        }

        let request = self
            .transition(
                id,
                &[CustomRequestStatus::Submitted, CustomRequestStatus::Quoted],
                |r| {
                    r.status = CustomRequestStatus::Quoted;
                    r.quoted_price = Some(price);
                    if notes.is_some() {
                        r.admin_notes = notes;
                    }
                },
            )
            .await?;

        self.notifier
            .dispatch_all("custom_request_quoted", messages::custom_request_quoted(&request))
            .await;
        Ok(request)
    }

    /// Customer accepts or declines the quote.
    #[instrument(skip(self))]
    pub async fn respond(&self, id: Uuid, approve: bool) -> Result<CustomRequest, ServiceError> {
        let request = self
            .transition(id, &[CustomRequestStatus::Quoted], |r| {
                r.status = if approve {
                    CustomRequestStatus::Approved
                } else {
                    CustomRequestStatus::Rejected
                };
            })
            .await?;

        self.notifier
            .dispatch_all(
                "custom_request_answered",
                messages::custom_request_answered(&request, self.notifier.admin()),
            )
            .await;
        Ok(request)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<CustomRequest, ServiceError> {
        let request = self
            .transition(
                id,
                &[CustomRequestStatus::Submitted, CustomRequestStatus::Quoted],
                |r| {
                    r.status = CustomRequestStatus::Rejected;
                    r.cancellation_reason = reason;
                },
            )
            .await?;

        self.notifier
            .dispatch_all("custom_request_rejected", messages::custom_request_rejected(&request))
            .await;
        Ok(request)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<CustomRequest, ServiceError> {
        let request = self
            .transition(
                id,
                &[CustomRequestStatus::Submitted, CustomRequestStatus::Quoted],
                |r| {
                    r.status = CustomRequestStatus::Cancelled;
                    r.cancellation_reason =
                        Some(reason.unwrap_or_else(|| "Cancelled by admin".to_string()));
                },
            )
            .await?;

        self.notifier
            .dispatch_all(
                "custom_request_cancelled",
                messages::custom_request_cancelled(&request, self.notifier.admin()),
            )
            .await;
        Ok(request)
    }

    pub async fn get(&self, id: Uuid) -> Result<CustomRequest, ServiceError> {
        self.load(id).await
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<CustomRequest>, ServiceError> {
        let mut requests: Vec<CustomRequest> =
            self.store.list_json(keys::CUSTOM_REQUEST_PREFIX).await?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }
}
