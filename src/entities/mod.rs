pub mod booking;
pub mod ride;
pub mod seat;
pub mod site_content;
pub mod user;
pub mod vehicle_template;
