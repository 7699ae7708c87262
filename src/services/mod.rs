pub mod conversion_service;
pub mod converter;
pub mod mail;
pub mod temp_store;
pub mod worker;
