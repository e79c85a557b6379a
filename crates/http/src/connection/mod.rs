mod http_connection;
pub use http_connection::HttpConnection;
pub use http_connection::IDLE_TIMEOUT;
