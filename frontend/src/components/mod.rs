pub mod capture_section;
pub mod header;
pub mod nutrition_label;
pub mod utils;
