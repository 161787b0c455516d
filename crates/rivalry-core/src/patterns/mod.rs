//! Pattern detectors
//!
//! Per-series detectors that Stage A and the classifier build on:
//!
//! - **Trend** - regression slope, dual-mode momentum, acceleration, projection
//! - **Volatility** - coefficient of variation, daily change, Bollinger breakouts
//! - **Seasonality** - calendar period peaks and cyclic strength

pub mod seasonality;
pub mod trend;
pub mod volatility;

pub use seasonality::{
    cyclic_strength, CyclicStrength, PeriodStat, SeasonalityAnalysis, SeasonalityDetector,
};
pub use trend::{
    acceleration, momentum, Momentum, MomentumMode, TrendAnalysis, TrendDetector, TrendDirection,
    TrendProjection,
};
pub use volatility::{
    bollinger_breakouts, daily_changes, Breakout, BreakoutDirection, VolatilityAnalysis,
    VolatilityDetector, VolatilityLevel,
};
