mod data;
mod health;
mod index;
mod photos;
mod session;

pub use data::show_data_route;
pub use health::{Healthz, healthz_route};
pub use index::{VERSION, index_route, render_front_page, render_login};
pub use photos::{delete_photo_route, list_photos_route, upload_photos_route};
pub use session::{login_route, logout_route, signup_route};
