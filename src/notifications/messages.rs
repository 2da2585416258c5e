//! Message composition for lifecycle events.
//!
//! Each composer returns the full list of [`NotificationRequest`]s an event
//! produces; recipients that are absent (no phone, no admin contact) are
//! skipped here rather than failing at send time.

use std::borrow::Cow;

use rust_decimal::Decimal;

use super::{AdminContacts, NotificationRequest};
use crate::models::{CustomRequest, CustomerInfo, Order};

fn money(amount: Decimal) -> String {
    format!("Rs. {}", amount.round_dp(2))
}

/// Escapes customer-supplied text for an HTML email body.
fn html(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

fn customer_text(customer: &CustomerInfo, body: String, out: &mut Vec<NotificationRequest>) {
    if let Some(phone) = customer.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        out.push(NotificationRequest::text(phone, body));
    }
}

fn admin_email(
    admin: &AdminContacts,
    subject: String,
    body: String,
    out: &mut Vec<NotificationRequest>,
) {
    if let Some(email) = &admin.email {
        out.push(NotificationRequest::email(email, subject, body));
    }
}

fn admin_text(admin: &AdminContacts, body: String, out: &mut Vec<NotificationRequest>) {
    if let Some(phone) = &admin.phone {
        out.push(NotificationRequest::text(phone, body));
    }
}

fn item_rows(order: &Order) -> String {
    order
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                html(&item.name),
                item.quantity,
                money(item.line_total())
            )
        })
        .collect()
}

/// Confirmation to the customer plus a new-order alert to staff.
pub fn order_placed(order: &Order, admin: &AdminContacts) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &order.customer_info;

    out.push(NotificationRequest::email(
        &customer.email,
        format!("Order confirmed: {}", order.tracking_id),
        format!(
            "<h2>Thank you, {}!</h2>\
             <p>Your order <strong>{}</strong> has been placed.</p>\
             <table>{}</table>\
             <p>Total: {} ({})</p>",
            html(&customer.name),
            order.tracking_id,
            item_rows(order),
            money(order.total),
            order.payment_type
        ),
    ));
    customer_text(
        customer,
        format!(
            "Order {} confirmed. Total {}. We'll let you know when it ships.",
            order.tracking_id,
            money(order.total)
        ),
        &mut out,
    );

    admin_email(
        admin,
        format!("New order {}", order.tracking_id),
        format!(
            "<p>New order <strong>{}</strong> from {} ({}).</p>\
             <table>{}</table>\
             <p>Total: {} via {}</p>",
            order.tracking_id,
            html(&customer.name),
            html(&customer.email),
            item_rows(order),
            money(order.total),
            html(&order.payment_method)
        ),
        &mut out,
    );
    admin_text(
        admin,
        format!(
            "New order {} from {}: {} items, {}",
            order.tracking_id,
            customer.name,
            order.item_count(),
            money(order.total)
        ),
        &mut out,
    );
    out
}

/// Status progression is reported to the customer only.
pub fn status_changed(order: &Order) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &order.customer_info;
    let label = order.status.label();

    out.push(NotificationRequest::email(
        &customer.email,
        format!("Order {} is {}", order.tracking_id, label),
        format!(
            "<p>Hi {},</p><p>Your order <strong>{}</strong> is now <strong>{}</strong>.</p>",
            html(&customer.name),
            order.tracking_id,
            label
        ),
    ));
    customer_text(
        customer,
        format!("Order {} update: {}", order.tracking_id, label),
        &mut out,
    );
    out
}

pub fn order_cancelled(order: &Order, admin: &AdminContacts) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &order.customer_info;
    let reason = order
        .cancellation_reason
        .as_deref()
        .unwrap_or("No reason given");
    let refund_note = if order.amount_paid > Decimal::ZERO {
        format!(
            "<p>A refund of {} will be processed to your original payment method.</p>",
            money(order.amount_paid)
        )
    } else {
        String::new()
    };

    out.push(NotificationRequest::email(
        &customer.email,
        format!("Order {} cancelled", order.tracking_id),
        format!(
            "<p>Hi {},</p><p>Your order <strong>{}</strong> has been cancelled.</p>\
             <p>Reason: {}</p>{}",
            html(&customer.name),
            order.tracking_id,
            html(reason),
            refund_note
        ),
    ));
    customer_text(
        customer,
        format!(
            "Order {} has been cancelled. Reason: {}",
            order.tracking_id, reason
        ),
        &mut out,
    );

    let by = order.cancelled_by.as_deref().unwrap_or("unknown");
    admin_email(
        admin,
        format!("Order {} cancelled", order.tracking_id),
        format!(
            "<p>Order <strong>{}</strong> for {} was cancelled by {}.</p><p>Reason: {}</p>",
            order.tracking_id,
            html(&customer.name),
            html(by),
            html(reason)
        ),
        &mut out,
    );
    admin_text(
        admin,
        format!("Order {} cancelled by {}: {}", order.tracking_id, by, reason),
        &mut out,
    );
    out
}

pub fn payment_received(order: &Order, amount: Decimal) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &order.customer_info;

    out.push(NotificationRequest::email(
        &customer.email,
        format!("Payment received for order {}", order.tracking_id),
        format!(
            "<p>Hi {},</p><p>We received {} for order <strong>{}</strong>.</p>\
             <p>Paid so far: {}. Remaining: {}.</p>",
            html(&customer.name),
            money(amount),
            order.tracking_id,
            money(order.amount_paid),
            money(order.amount_due)
        ),
    ));
    customer_text(
        customer,
        format!(
            "Payment of {} received for order {}. Due: {}",
            money(amount),
            order.tracking_id,
            money(order.amount_due)
        ),
        &mut out,
    );
    out
}

/// Staff alert plus customer acknowledgement for a new custom request.
pub fn custom_request_submitted(
    request: &CustomRequest,
    admin: &AdminContacts,
) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &request.customer_info;
    let budget = request
        .budget
        .map(money)
        .unwrap_or_else(|| "not specified".to_string());

    admin_email(
        admin,
        format!("New custom request from {}", customer.name),
        format!(
            "<p>{} ({}) submitted a custom request.</p><p>{}</p><p>Budget: {}</p>",
            html(&customer.name),
            html(&customer.email),
            html(&request.description),
            budget
        ),
        &mut out,
    );
    admin_text(
        admin,
        format!(
            "New custom request from {} (budget {})",
            customer.name, budget
        ),
        &mut out,
    );
    out.push(NotificationRequest::email(
        &customer.email,
        "We received your custom request",
        format!(
            "<p>Hi {},</p><p>Thanks for your request. We'll get back to you with a quote soon.</p>\
             <p>Reference: {}</p>",
            html(&customer.name),
            request.id
        ),
    ));
    out
}

pub fn custom_request_quoted(request: &CustomRequest) -> Vec<NotificationRequest> {
    let customer = &request.customer_info;
    let price = request
        .quoted_price
        .map(money)
        .unwrap_or_else(|| "-".to_string());
    let notes = request.admin_notes.as_deref().unwrap_or_default();

    vec![NotificationRequest::email(
        &customer.email,
        "Your custom request has been quoted",
        format!(
            "<p>Hi {},</p><p>Our quote for your request is <strong>{}</strong>.</p><p>{}</p>",
            html(&customer.name),
            price,
            html(notes)
        ),
    )]
}

/// Customer's answer to a quote, sent to staff.
pub fn custom_request_answered(
    request: &CustomRequest,
    admin: &AdminContacts,
) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &request.customer_info;
    let verdict = request.status.to_string();

    admin_email(
        admin,
        format!("Custom request {} {}", request.id, verdict),
        format!(
            "<p>{} has {} the quote for request {}.</p>",
            html(&customer.name),
            verdict.to_lowercase(),
            request.id
        ),
        &mut out,
    );
    admin_text(
        admin,
        format!(
            "{} {} custom request quote",
            customer.name,
            verdict.to_lowercase()
        ),
        &mut out,
    );
    out
}

pub fn custom_request_rejected(request: &CustomRequest) -> Vec<NotificationRequest> {
    let customer = &request.customer_info;
    let reason = request
        .cancellation_reason
        .as_deref()
        .unwrap_or("We are unable to fulfil this request.");

    vec![NotificationRequest::email(
        &customer.email,
        "Update on your custom request",
        format!("<p>Hi {},</p><p>{}</p>", html(&customer.name), html(reason)),
    )]
}

pub fn custom_request_cancelled(
    request: &CustomRequest,
    admin: &AdminContacts,
) -> Vec<NotificationRequest> {
    let mut out = Vec::new();
    let customer = &request.customer_info;
    let reason = request
        .cancellation_reason
        .as_deref()
        .unwrap_or("No reason given");

    out.push(NotificationRequest::email(
        &customer.email,
        "Your custom request was cancelled",
        format!(
            "<p>Hi {},</p><p>Your custom request has been cancelled.</p><p>Reason: {}</p>",
            html(&customer.name),
            html(reason)
        ),
    ));
    customer_text(
        customer,
        format!("Your custom request was cancelled. Reason: {}", reason),
        &mut out,
    );
    admin_email(
        admin,
        format!("Custom request {} cancelled", request.id),
        format!(
            "<p>Request {} cancelled. Reason: {}</p>",
            request.id,
            html(reason)
        ),
        &mut out,
    );
    admin_text(
        admin,
        format!("Custom request for {} cancelled", customer.name),
        &mut out,
    );
    out
}
