// storefront/src/models/mod.rs

pub mod email_log;
pub mod money;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use email_log::{EmailLog, EmailStatus, NewEmailLog};
pub use order::{Order, OrderDetail, OrderStatus, ShippingAddress};
pub use order_item::{OrderItem, OrderItemDetail, OrderItemRow, ProductSnapshot};
pub use product::{NewProduct, Product, ProductPatch, ProductQuery};
pub use user::{NewUser, Principal, Role, User};
