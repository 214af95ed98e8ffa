pub mod commands;
pub mod config;
pub mod graphql;
pub mod http;
pub mod request;
pub mod response;

pub use http::RequestClient;
pub use request::{Headers, Method, RequestBody, RequestSpec};
pub use response::{Body, ErrorKind, Failure, ResponseResult, Success};
