//! Terminal output: layout, legend and the scroll-region renderer

pub mod layout;
pub mod legend;
mod render;
pub mod theme;

pub use layout::{value_to_column, window_minmax, Layout, LayoutError};
pub use legend::LegendEntry;
pub use render::{
    Chrome, RenderError, RenderState, Renderer, ResetScrollRegion, SetScrollRegion,
};
pub use theme::ThemeColors;
