pub mod inquiries;
pub mod orders;
pub mod products;
pub mod users;

pub use inquiries::Entity as Inquiries;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
