mod auth;
mod fleet;
mod reports;
mod tenancy;
