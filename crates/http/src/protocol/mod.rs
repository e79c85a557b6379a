mod body;
pub use body::ParsedBody;

mod error;
pub use error::HttpError;
pub use error::ParseError;

mod header;
pub use header::HeaderMap;

mod method;
pub use method::Method;

mod query;
pub use query::parse_query;
pub use query::percent_decode;

mod request;
pub use request::Request;

mod response;
pub use response::status_phrase;
pub use response::Response;
