pub mod fvg;
pub mod indicators;
pub mod levels;
pub mod regime;
pub mod risk_filters;
pub mod sessions;
