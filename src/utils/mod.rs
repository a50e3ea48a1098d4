pub mod mask;
pub mod parser;

pub use mask::mask_sensitive;
pub use parser::{normalize_portal_date, parse_energy_value, parse_input_date};
