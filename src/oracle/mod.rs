// Oracle module - Oracle Database through the oracle crate (ODPI-C)
//
// - client: parsing ODP-style connection strings and connecting
// - params: typed values and output bind types by OracleDbType
// - query: row extraction and result buffering
// - executor: the `Backend` implementation, including PL/SQL procedure blocks

mod client;
mod executor;
mod params;
mod query;

pub use executor::OracleBackend;
