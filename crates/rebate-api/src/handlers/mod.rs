pub mod oauth;
pub mod resources;
