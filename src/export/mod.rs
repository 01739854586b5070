pub mod csv;

pub use csv::ExportKind;
