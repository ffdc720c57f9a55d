pub mod analytics;
pub mod applications;
pub mod internships;
pub mod sessions;
pub mod users;

pub use analytics::*;
pub use applications::*;
pub use internships::*;
pub use sessions::*;
pub use users::*;
