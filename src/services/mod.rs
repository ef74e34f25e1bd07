pub mod affiliate_service;
pub mod auth_service;
pub mod cart_service;
pub mod ledger;
pub mod order_service;
pub mod payment_service;
pub mod shipment_service;
pub mod user_service;
pub mod withdrawal_service;

pub use affiliate_service::AffiliateService;
pub use auth_service::*;
pub use cart_service::*;
pub use order_service::*;
pub use payment_service::*;
pub use shipment_service::*;
pub use user_service::*;
pub use withdrawal_service::*;
