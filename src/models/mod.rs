pub mod affiliate;
pub mod cart;
pub mod common;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod user;
pub mod withdrawal;

pub use affiliate::*;
pub use cart::*;
pub use common::*;
pub use order::*;
pub use pagination::*;
pub use payment::*;
pub use user::*;
pub use withdrawal::*;
