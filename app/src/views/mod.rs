mod converter;
mod learn;
mod progress;
mod youtube;

pub use converter::ConverterView;
pub use learn::LearnView;
pub use youtube::YoutubeView;
