pub mod dto;
pub mod rate_limiter;
pub mod routes;
pub mod twiml;
pub mod webhooks;
