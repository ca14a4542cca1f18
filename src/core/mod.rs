pub mod detector;
pub mod dispatch;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod universal;

pub use request::CanonicalRequest;
pub use response::{CanonicalResponse, ResponseError, ResponseParts};
pub use router::Router;
pub use universal::UniversalAdapter;
