pub mod checkout;
pub mod free_orders;
pub mod fulfillment;
pub mod inventory;
pub mod orders;
pub mod webhooks;

pub use checkout::CheckoutService;
pub use free_orders::{FreeOrderReceipt, FreeOrderService};
pub use fulfillment::FulfillmentEngine;
pub use orders::OrderHistory;
pub use webhooks::{WebhookAck, WebhookService};
