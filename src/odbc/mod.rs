// ODBC module - any ODBC data source through odbc-api
//
// - client: the shared environment and connecting with a connection string
// - params: boxed input parameters by OdbcType
// - query: column kinds, row extraction and multi-result buffering
// - executor: the `Backend` implementation

mod client;
mod executor;
mod params;
mod query;

pub use executor::OdbcBackend;
