pub mod api_client;
pub mod auth_client;
pub mod metrics;
pub mod session_manager;
pub mod single_flight;

pub use api_client::ApiClient;
pub use auth_client::AuthClient;
pub use session_manager::SessionManager;
pub use single_flight::SingleFlight;
