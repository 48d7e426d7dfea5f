pub mod digest_row;
pub mod severity_count;
