// MSSQL module - SQL Server through tiberius
//
// - client: connecting from an ADO.NET connection string
// - params: binding parameters by their SqlDbType
// - query: row extraction and multi-result buffering
// - procedure: T-SQL batches for procedure calls with output values
// - executor: the `Backend` implementation

mod client;
mod executor;
mod params;
mod procedure;
mod query;

pub use executor::SqlServerBackend;
