/// Tower middleware for the API server
///
/// Session authentication lives next to the router in `app`, since it needs
/// the application state.

pub mod security;
