pub mod cart;
pub mod event;
pub mod order;
pub mod ticket;
pub mod ticket_type;
pub mod webhook;

pub use cart::{Cart, CartLine};
pub use event::{Event, EventStatus, EventSummary};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderItemView, OrderStatus, OrderSummary,
    OrderWithItems,
};
pub use ticket::{NewTicket, Ticket, TicketOrderRef, TicketView};
pub use ticket_type::{TicketType, TicketTypeSummary};
pub use webhook::{WebhookEventRecord, WebhookProvider};
