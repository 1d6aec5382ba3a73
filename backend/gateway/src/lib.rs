pub mod routes;
pub mod server;
pub mod state;
pub mod welcome;

pub use routes::build_router;
pub use server::start_server;
pub use state::AppState;
pub use welcome::WelcomeBoard;
