//! HTTP/1.1 wire layer: request parsing, response building and the
//! per-connection driver. The routing and middleware layers live in the
//! companion `rivet-web` crate, plugged in through [`handler::Handler`].

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

pub(crate) use help::ensure;

mod help {

    macro_rules! ensure {
        ($predicate:expr, $error:expr) => {
            if !$predicate {
                return Err($error);
            }
        };
    }
    pub(crate) use ensure;
}
