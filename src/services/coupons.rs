use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    errors::ServiceError,
    models::{normalize_code, Coupon, DiscountType},
    store::{keys, KeyLocks, KeyValueStoreExt, SharedStore},
};

/// Result of checking a code against a cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub valid: bool,
    pub discount_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
}

impl CouponValidation {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount_amount: Decimal::ZERO,
            reason: Some(reason.into()),
            coupon: None,
        }
    }
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_not_be_negative"))
    }
}

/// Admin input for a new coupon.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub discount_type: DiscountType,
    #[validate(custom = "validate_positive")]
    pub discount_value: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub min_purchase: Decimal,
    #[validate(custom = "validate_positive")]
    pub max_discount: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponUpdate {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    pub discount_type: Option<DiscountType>,
    #[validate(custom = "validate_positive")]
    pub discount_value: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub min_purchase: Option<Decimal>,
    #[validate(custom = "validate_positive")]
    pub max_discount: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub is_active: Option<bool>,
}

/// Discount for `cart_total`, never above the cart total, rounded to cents.
pub fn compute_discount(coupon: &Coupon, cart_total: Decimal) -> Decimal {
    if cart_total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let amount = cart_total * coupon.discount_value / Decimal::ONE_HUNDRED;
            match coupon.max_discount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    };
    raw.min(cart_total)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn check_percentage(discount_type: DiscountType, value: Decimal) -> Result<(), ServiceError> {
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "Percentage discount cannot exceed 100".to_string(),
        ));
    }
    Ok(())
}

/// Discount codes: lookup, discount math and admin maintenance.
#[derive(Clone)]
pub struct CouponEngine {
    store: SharedStore,
    locks: KeyLocks,
}

impl CouponEngine {
    pub fn new(store: SharedStore, locks: KeyLocks) -> Self {
        Self { store, locks }
    }

    async fn find_by_code(
        &self,
        code: &str,
        active_only: bool,
    ) -> Result<Option<Coupon>, ServiceError> {
        let coupons: Vec<Coupon> = self.store.list_json(keys::COUPON_PREFIX).await?;
        Ok(coupons
            .into_iter()
            .find(|c| c.matches_code(code) && (!active_only || c.is_active)))
    }

    fn evaluate(coupon: Coupon, cart_total: Option<Decimal>) -> CouponValidation {
        let now = Utc::now();
        if coupon.is_expired_at(now) {
            return CouponValidation::rejected("Coupon has expired");
        }
        if coupon.is_exhausted() {
            return CouponValidation::rejected("Coupon usage limit reached");
        }

        let discount_amount = match cart_total {
            Some(total) => {
                if total < coupon.min_purchase {
                    return CouponValidation::rejected(format!(
                        "Minimum purchase of {} required",
                        coupon.min_purchase
                    ));
                }
                compute_discount(&coupon, total)
            }
            None => Decimal::ZERO,
        };

        CouponValidation {
            valid: true,
            discount_amount,
            reason: None,
            coupon: Some(coupon),
        }
    }

    /// Pre-flight check used by the cart.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        cart_total: Decimal,
    ) -> Result<CouponValidation, ServiceError> {
        match self.find_by_code(code, false).await? {
            Some(coupon) => Ok(Self::evaluate(coupon, Some(cart_total))),
            None => Ok(CouponValidation::rejected("Invalid coupon code")),
        }
    }

    /// Checkout-time validate-and-apply. Only active coupons qualify; without
    /// a cart total the minimum-purchase check is skipped and no amount is
    /// computed.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        code: &str,
        cart_total: Option<Decimal>,
    ) -> Result<CouponValidation, ServiceError> {
        match self.find_by_code(code, true).await? {
            Some(coupon) => Ok(Self::evaluate(coupon, cart_total)),
            None => Ok(CouponValidation::rejected("Invalid or inactive coupon code")),
        }
    }

    /// `usage_count += 1`. Not transactional across processes.
    #[instrument(skip(self))]
    pub async fn record_usage(&self, id: Uuid) -> Result<Coupon, ServiceError> {
        let key = keys::coupon(id);
        let _guard = self.locks.lock(&key).await;

        let mut coupon: Coupon = self
            .store
            .get_json(&key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;
        coupon.usage_count = coupon.usage_count.saturating_add(1);
        coupon.updated_at = Utc::now();
        self.store.set_json(&key, &coupon).await?;

        info!(code = %coupon.code, usage_count = coupon.usage_count, "coupon usage recorded");
        Ok(coupon)
    }

    pub async fn get(&self, id: Uuid) -> Result<Coupon, ServiceError> {
        self.store
            .get_json(&keys::coupon(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Coupon>, ServiceError> {
        let mut coupons: Vec<Coupon> = self.store.list_json(keys::COUPON_PREFIX).await?;
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(coupons)
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(existing) = self.find_by_code(code, false).await? {
            if Some(existing.id) != except {
                return Err(ServiceError::Conflict(format!(
                    "Coupon code {} already exists",
                    existing.code
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: NewCoupon) -> Result<Coupon, ServiceError> {
        input.validate()?;
        check_percentage(input.discount_type, input.discount_value)?;

        let code = normalize_code(&input.code);
        let _guard = self.locks.lock(&format!("{}code:{}", keys::COUPON_PREFIX, code)).await;
        self.ensure_code_free(&code, None).await?;

        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            min_purchase: input.min_purchase,
            max_discount: input.max_discount,
            expiry_date: input.expiry_date,
            usage_limit: input.usage_limit,
            usage_count: 0,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        self.store.set_json(&keys::coupon(coupon.id), &coupon).await?;

        info!(coupon_id = %coupon.id, "coupon created");
        Ok(coupon)
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: CouponUpdate) -> Result<Coupon, ServiceError> {
        update.validate()?;

        let key = keys::coupon(id);
        let _guard = self.locks.lock(&key).await;
        let mut coupon = self.get(id).await?;

        if let Some(code) = update.code.as_deref() {
            let code = normalize_code(code);
            if code != coupon.code {
                self.ensure_code_free(&code, Some(id)).await?;
                coupon.code = code;
            }
        }
        if let Some(discount_type) = update.discount_type {
            coupon.discount_type = discount_type;
        }
        if let Some(value) = update.discount_value {
            coupon.discount_value = value;
        }
        check_percentage(coupon.discount_type, coupon.discount_value)?;
        if let Some(min_purchase) = update.min_purchase {
            coupon.min_purchase = min_purchase;
        }
        if update.max_discount.is_some() {
            coupon.max_discount = update.max_discount;
        }
        if update.expiry_date.is_some() {
            coupon.expiry_date = update.expiry_date;
        }
        if update.usage_limit.is_some() {
            coupon.usage_limit = update.usage_limit;
        }
        if let Some(active) = update.is_active {
            coupon.is_active = active;
        }
        coupon.updated_at = Utc::now();

        self.store.set_json(&key, &coupon).await?;
        info!(coupon_id = %id, "coupon updated");
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let key = keys::coupon(id);
        let _guard = self.locks.lock(&key).await;
        if self.store.get(&key).await?.is_none() {
            warn!(coupon_id = %id, "delete requested for unknown coupon");
            return Err(ServiceError::NotFound(format!("Coupon {} not found", id)));
        }
        self.store.del(&key).await?;
        info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }
}
