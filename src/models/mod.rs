pub mod coupon;
pub mod custom_request;
pub mod order;
pub mod product;

pub use coupon::{normalize_code, Coupon, DiscountType};
pub use custom_request::{CustomRequest, CustomRequestStatus};
pub use order::{
    CustomerInfo, Order, OrderItem, OrderStatus, PaymentEntry, PaymentStatus, PaymentType,
};
pub use product::Product;
