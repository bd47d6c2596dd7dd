pub mod files_response;
pub mod files_route;
