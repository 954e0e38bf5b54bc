pub mod ranking;
pub mod redirect;
pub mod shorten;

pub use ranking::RankingEngine;
pub use redirect::RedirectResolver;
pub use shorten::ShortenService;
