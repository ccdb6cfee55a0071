pub mod errors;
pub mod events;
pub mod models;
pub mod notify;
pub mod series;

pub use errors::*;
pub use events::*;
pub use models::*;
pub use notify::*;
pub use series::*;
