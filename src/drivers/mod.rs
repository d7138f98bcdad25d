mod driver;
mod element;
pub mod http_driver;
pub mod mock_driver;

pub use driver::{choose_user_agent, Driver, DriverError, DEFAULT_USER_AGENTS};
pub use element::{select_document, PageElement};
pub use http_driver::HttpDriver;
pub use mock_driver::{MockDriver, MockDriverHandle, MockPage};
