pub mod nominatim;
pub mod voter_info;
