// Library management module
// Audio store over the database plus directory import

pub mod scanner;
pub mod store;

pub use scanner::DirectoryScanner;
pub use store::AudioStore;
