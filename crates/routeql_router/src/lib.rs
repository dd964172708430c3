//! Router for routeql.
//!
//! A small route table with realms, tags, named auth strategies,
//! internal-only methods and pre-start hooks, served over hyper.

pub mod auth;
pub mod error;
pub mod listener;
pub mod request;
pub mod route;
pub mod router;

pub use auth::{AuthStrategy, BearerTokens};
pub use error::{ErrorBody, RouteError, RouterError};
pub use listener::{serve, serve_listener, ServeConfig};
pub use request::{ResponseBody, RouteRequest, RouteResponse};
pub use route::{join_path, Handler, Route, RouteInfo, RouteMethod, SharedHandler};
pub use router::{PreStartHook, Realm, Router};
