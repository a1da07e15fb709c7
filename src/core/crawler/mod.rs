#[allow(clippy::module_inception)]
mod crawler;

pub use crawler::Crawler;
