mod error;
mod handler;
pub mod middleware;
mod pipeline;
pub mod router;
mod server;

pub use error::HandlerError;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::HandlerFuture;
pub use handler::RouteHandler;
pub use pipeline::run_route_stack;
pub use pipeline::ErrorMiddleware;
pub use pipeline::Middleware;
pub use pipeline::Pipeline;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
