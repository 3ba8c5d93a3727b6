// SQLite module - embedded backend through rusqlite
//
// - client: opening a connection from a path or `Data Source=` string
// - params: binding parameters as rusqlite values
// - query: row extraction and result buffering
// - executor: the `Backend` implementation

mod client;
mod executor;
mod params;
mod query;

pub use executor::SqliteBackend;
