pub mod error_location;
pub mod io_kind;
