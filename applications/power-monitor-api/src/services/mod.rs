pub mod readings;

pub use readings::ReadingsService;
