pub mod affiliate_applications;
pub mod affiliates;
pub mod cart_items;
pub mod commissions;
pub mod order_items;
pub mod orders;
pub mod payment_events;
pub mod products;
pub mod users;
pub mod withdraw_requests;

pub use affiliate_applications as affiliate_application_entity;
pub use affiliates as affiliate_entity;
pub use cart_items as cart_item_entity;
pub use commissions as commission_entity;
pub use order_items as order_item_entity;
pub use orders as order_entity;
pub use payment_events as payment_event_entity;
pub use products as product_entity;
pub use users as user_entity;
pub use withdraw_requests as withdraw_request_entity;
