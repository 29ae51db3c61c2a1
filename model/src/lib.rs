mod positional;

pub use positional::PositionalModel;
