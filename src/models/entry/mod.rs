pub mod api_entry;
pub mod db_entry;
pub mod log_entry;
