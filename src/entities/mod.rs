pub mod academic_year;
pub mod album;
pub mod course;
pub mod institution;
pub mod order;
pub mod order_cart;
pub mod package;
pub mod package_album;
pub mod payment;
pub mod photo;
pub mod product_type;
pub mod product_variation;
pub mod user;
