// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations used by the signal engine.
// Values that need more history than is available are reported as `None`
// rather than a placeholder number.

pub mod sma;
