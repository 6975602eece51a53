//! Scan direction, expressed as zero-sized types so the executor can be
//! monomorphized per direction.

#[derive(Debug, Copy, Clone)]
pub struct Forward;

#[derive(Debug, Copy, Clone)]
pub struct Backward;

/// A scan direction. Forward scans consume bytes left to right; backward
/// scans (used for features like trailing-context matching) consume them
/// right to left. The bulk loop scanner only engages on forward scans.
pub trait Direction: core::fmt::Debug + Copy + Clone {
    const FORWARD: bool;
    fn new() -> Self;
}

impl Direction for Forward {
    const FORWARD: bool = true;
    #[inline(always)]
    fn new() -> Self {
        Forward {}
    }
}

impl Direction for Backward {
    const FORWARD: bool = false;
    #[inline(always)]
    fn new() -> Self {
        Backward {}
    }
}
