pub mod command;
pub mod command_handler;
pub mod context;
pub mod decorator;
pub mod decorators;
pub mod dispatcher;
pub mod error;
pub mod event_handler;
pub mod factory;
pub mod marker;
pub mod pipeline;
pub mod query;
pub mod query_handler;
pub mod registry;
pub mod services;

pub use decorator::DecoratorMap;
pub use dispatcher::Dispatcher;
pub use registry::HandlerRegistry;
pub use services::ServiceProvider;
