use ndarray::{ArrayView3, ArrayViewMut3};

/// A single captured camera frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at the capture boundary only; everything
/// downstream of a `FrameSource` sees tightly packed RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            sequence,
        }
    }

    /// Solid-colour RGB frame, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 3, sequence)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Monotonically increasing per source, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// RGB value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height || self.channels < 3 {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * self.channels as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.sequence(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_filled_sets_every_pixel() {
        let frame = Frame::filled(3, 2, [10, 20, 30], 1);
        assert_eq!(frame.data().len(), 18);
        assert_eq!(frame.pixel(0, 0), Some([10, 20, 30]));
        assert_eq!(frame.pixel(2, 1), Some([10, 20, 30]));
    }

    #[test]
    fn test_pixel_out_of_bounds_is_none() {
        let frame = Frame::filled(3, 2, [0, 0, 0], 1);
        assert_eq!(frame.pixel(3, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::filled(2, 2, [100, 100, 100], 0);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::filled(2, 2, [0, 0, 0], 0);
        {
            let mut arr = frame.as_ndarray_mut();
            arr[[0, 1, 2]] = 128; // row=0, col=1, B channel
        }
        assert_eq!(frame.pixel(1, 0), Some([0, 0, 128]));
    }
}
