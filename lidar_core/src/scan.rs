// lidar_core/src/scan.rs

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::LidarError;
use crate::grid::RayGrid;
use crate::perception::{RawSample, NO_FIDUCIAL};
use crate::resample::{RangeLimits, ResampledScan};

/// Number of interleaved values per range in a frame: range, intensity, fiducial.
pub const FRAME_CHANNELS: u32 = 3;

// =========================================================================
// == Scan Buffer ==
// =========================================================================

/// One complete, immutable scan: the raw ray samples of a tick and the
/// range arrays derived from them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanBuffer {
    timestamp: f64,
    width: u32,
    height: u32,
    raw: Vec<RawSample>,
    ranges: Vec<f64>,
    intensities: Vec<f64>,
    fiducials: Vec<i32>,
}

impl ScanBuffer {
    /// A scan where every ray and every range reports no detection.
    pub fn no_detection(grid: &RayGrid, limits: &RangeLimits) -> Self {
        let total = grid.total_ranges();
        Self {
            timestamp: 0.0,
            width: grid.range_count(),
            height: grid.vertical_range_count(),
            raw: vec![RawSample::miss(); grid.total_rays()],
            ranges: vec![limits.max; total],
            intensities: vec![0.0; total],
            fiducials: vec![NO_FIDUCIAL; total],
        }
    }

    pub fn from_resampled(
        timestamp: f64,
        grid: &RayGrid,
        raw: Vec<RawSample>,
        resampled: ResampledScan,
    ) -> Self {
        Self {
            timestamp,
            width: grid.range_count(),
            height: grid.vertical_range_count(),
            raw,
            ranges: resampled.ranges,
            intensities: resampled.intensities,
            fiducials: resampled.fiducials,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Horizontal range count.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Vertical range count.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn check(&self, index: usize) -> Result<usize, LidarError> {
        if index < self.ranges.len() {
            Ok(index)
        } else {
            Err(LidarError::IndexOutOfRange {
                index,
                len: self.ranges.len(),
            })
        }
    }

    /// Range at `index`; `range_max` means no detection.
    pub fn range(&self, index: usize) -> Result<f64, LidarError> {
        self.check(index).map(|i| self.ranges[i])
    }

    /// Intensity (retro-reflectivity) at `index`.
    pub fn retro(&self, index: usize) -> Result<f64, LidarError> {
        self.check(index).map(|i| self.intensities[i])
    }

    pub fn fiducial(&self, index: usize) -> Result<i32, LidarError> {
        self.check(index).map(|i| self.fiducials[i])
    }

    pub fn ranges(&self) -> &[f64] {
        &self.ranges
    }

    /// Copies all ranges into `out`, replacing its contents.
    pub fn ranges_into(&self, out: &mut Vec<f64>) {
        out.clear();
        out.extend_from_slice(&self.ranges);
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn fiducials(&self) -> &[i32] {
        &self.fiducials
    }

    /// The raw ray samples this scan was resampled from.
    pub fn raw(&self) -> &[RawSample] {
        &self.raw
    }

    /// Interleaved `f32` frame handed to frame callbacks,
    /// `FRAME_CHANNELS` values per range.
    pub fn frame(&self) -> Vec<f32> {
        let mut frame = Vec::with_capacity(self.len() * FRAME_CHANNELS as usize);
        for ((range, intensity), fiducial) in self
            .ranges
            .iter()
            .zip(&self.intensities)
            .zip(&self.fiducials)
        {
            frame.extend_from_slice(&[*range as f32, *intensity as f32, *fiducial as f32]);
        }
        frame
    }
}

// =========================================================================
// == Shared Slot ==
// =========================================================================

#[derive(Debug)]
struct SlotState {
    current: Arc<ScanBuffer>,
    active: bool,
}

/// Holds the current scan. The pointer and the active flag share one lock,
/// so a swap and a pause can never interleave.
#[derive(Debug)]
pub struct ScanSlot {
    state: Mutex<SlotState>,
}

impl ScanSlot {
    pub fn new(buffer: ScanBuffer) -> Self {
        Self {
            state: Mutex::new(SlotState {
                current: Arc::new(buffer),
                active: true,
            }),
        }
    }

    /// The current scan. Holding the returned `Arc` keeps it alive and
    /// unchanged regardless of later swaps.
    pub fn snapshot(&self) -> Arc<ScanBuffer> {
        Arc::clone(&self.state.lock().current)
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn set_active(&self, active: bool) {
        self.state.lock().active = active;
    }

    /// Makes `buffer` current unless the slot is paused. Returns whether
    /// the swap happened.
    pub fn publish(&self, buffer: Arc<ScanBuffer>) -> bool {
        let mut state = self.state.lock();
        if !state.active {
            return false;
        }
        state.current = buffer;
        true
    }

    /// Replaces the current scan even while paused.
    pub fn reset(&self, buffer: ScanBuffer) {
        self.state.lock().current = Arc::new(buffer);
    }
}

impl Default for ScanSlot {
    fn default() -> Self {
        Self::new(ScanBuffer::default())
    }
}

/// A cloneable handle for reading a sensor's scans from other threads.
#[derive(Debug, Clone)]
pub struct ScanReader {
    slot: Arc<ScanSlot>,
}

impl ScanReader {
    pub(crate) fn new(slot: Arc<ScanSlot>) -> Self {
        Self { slot }
    }

    pub fn snapshot(&self) -> Arc<ScanBuffer> {
        self.slot.snapshot()
    }

    pub fn range(&self, index: usize) -> Result<f64, LidarError> {
        self.slot.snapshot().range(index)
    }

    pub fn retro(&self, index: usize) -> Result<f64, LidarError> {
        self.slot.snapshot().retro(index)
    }

    pub fn fiducial(&self, index: usize) -> Result<i32, LidarError> {
        self.slot.snapshot().fiducial(index)
    }

    pub fn ranges(&self, out: &mut Vec<f64>) {
        self.slot.snapshot().ranges_into(out);
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }

    /// Pausing stops the sensor from replacing the current scan, so a loop
    /// over several accessor calls reads one consistent scan.
    pub fn set_active(&self, active: bool) {
        self.slot.set_active(active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Axis, ScanAxis};

    fn sample_buffer() -> ScanBuffer {
        let grid = RayGrid::new(
            ScanAxis::new(Axis::Horizontal, 3, 3, -1.0, 1.0).unwrap(),
            ScanAxis::single(),
        );
        ScanBuffer::from_resampled(
            1.5,
            &grid,
            vec![RawSample::hit(1.0, 0.5); 3],
            ResampledScan {
                ranges: vec![1.0, 2.0, 3.0],
                intensities: vec![0.5, 0.25, 0.0],
                fiducials: vec![4, NO_FIDUCIAL, 6],
            },
        )
    }

    #[test]
    fn accessors_are_bounds_checked() {
        let buffer = sample_buffer();
        assert_eq!(buffer.range(2), Ok(3.0));
        assert_eq!(buffer.retro(1), Ok(0.25));
        assert_eq!(buffer.fiducial(0), Ok(4));
        assert_eq!(
            buffer.range(3),
            Err(LidarError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert!(buffer.retro(10).is_err());
        assert!(buffer.fiducial(3).is_err());
    }

    #[test]
    fn ranges_into_replaces_contents() {
        let buffer = sample_buffer();
        let mut out = vec![9.0; 10];
        buffer.ranges_into(&mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn frame_interleaves_three_channels() {
        let frame = sample_buffer().frame();
        assert_eq!(frame.len(), 9);
        assert_eq!(&frame[..3], &[1.0, 0.5, 4.0]);
        assert_eq!(&frame[3..6], &[2.0, 0.25, -1.0]);
    }

    #[test]
    fn no_detection_buffer_reports_range_max() {
        let grid = RayGrid::planar(4, -1.0, 1.0).unwrap();
        let limits = RangeLimits {
            min: 0.2,
            max: 30.0,
            resolution: 0.01,
        };
        let buffer = ScanBuffer::no_detection(&grid, &limits);
        assert_eq!(buffer.ranges(), &[30.0; 4]);
        assert_eq!(buffer.raw().len(), 4);
        assert_eq!((buffer.width(), buffer.height()), (4, 1));
    }

    #[test]
    fn paused_slot_keeps_the_current_scan() {
        let slot = ScanSlot::new(sample_buffer());
        slot.set_active(false);
        assert!(!slot.publish(Arc::new(ScanBuffer::default())));
        assert_eq!(slot.snapshot().len(), 3);

        slot.set_active(true);
        assert!(slot.publish(Arc::new(ScanBuffer::default())));
        assert!(slot.snapshot().is_empty());
    }

    #[test]
    fn snapshots_survive_swaps() {
        let slot = ScanSlot::new(sample_buffer());
        let held = slot.snapshot();
        slot.publish(Arc::new(ScanBuffer::default()));
        assert_eq!(held.ranges(), &[1.0, 2.0, 3.0]);
    }
}
