//! Color constants for surface clearing.
//!
//! Components are in the range [0.0, 1.0].

pub use rgb::Rgba;

/// The color type used by the renderer. RGBA with f32 components in [0.0, 1.0].
pub type Color = Rgba<f32>;

/// <div style="margin:2px 0"><span style="background-color:rgba(0, 0, 0, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Transparent (0, 0, 0, 0)</div>
pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

/// <div style="margin:2px 0"><span style="background-color:rgba(255, 255, 255, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Transparent white (255, 255, 255, 0)</div>
pub const TRANSPARENT_WHITE: Color = Color::new(1.0, 1.0, 1.0, 0.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(0, 0, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Black (0, 0, 0)</div>
pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(255, 255, 255);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>White (255, 255, 255)</div>
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
