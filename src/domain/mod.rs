//! Domain types

pub mod cart;
pub mod events;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use events::OrderConfirmation;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::Product;
pub use user::User;
