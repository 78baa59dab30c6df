// Conversion pipeline shared by the binary and its tests

pub mod pipeline;

pub use pipeline::{
    classify_file, convert_bill, convert_report, default_archive_name, Conversion, ConvertError, Options,
};
