//! Charts module - SVG rendering of view outcomes

mod renderer;

pub use renderer::{ChartRenderer, RenderError};
