//! CPU-side plane buffers.
//!
//! The decoder writes decoded planes into a [`MovieBuffer`] and the render
//! thread reads the same buffer when uploading to the GPU. A buffer does no
//! locking of its own: the player keeps both planes behind one mutex, so a
//! [`PlaneViewMut`] can only exist while that mutex is held.

use serde::{Deserialize, Serialize};

/// 8-bit pixel layouts used by the movie planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Single channel (luma only, or one chroma plane).
    #[default]
    L8,
    /// Two interleaved channels (luma+alpha, or U+V).
    LA8,
}

impl PixelFormat {
    pub const ALL: &[PixelFormat] = &[PixelFormat::L8, PixelFormat::LA8];

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::L8 => 1,
            PixelFormat::LA8 => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PixelFormat::L8 => "L8",
            PixelFormat::LA8 => "LA8",
        }
    }
}

/// Owned pixel storage for one plane.
#[derive(Debug, Default)]
pub struct MovieBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl MovieBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed buffer. Replaces any previous allocation.
    pub fn init(&mut self, width: u32, height: u32, format: PixelFormat) {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        self.data = vec![0u8; len];
        self.width = width;
        self.height = height;
        self.format = format;
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(0);
    }

    /// Release the backing storage. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.data = Vec::new();
        self.width = 0;
        self.height = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row. Rows are tightly packed.
    pub fn pitch(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Borrow the whole plane for writing (decoder) or reading (upload).
    /// The view ends the lock when dropped.
    pub fn lock(&mut self) -> PlaneViewMut<'_> {
        let pitch = self.pitch();
        PlaneViewMut {
            data: &mut self.data,
            width: self.width,
            height: self.height,
            pitch,
            format: self.format,
        }
    }

    pub fn view(&self) -> PlaneView<'_> {
        PlaneView {
            data: &self.data,
            width: self.width,
            height: self.height,
            pitch: self.pitch(),
            format: self.format,
        }
    }
}

/// Read-only view of a locked plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
}

impl<'a> PlaneView<'a> {
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.pitch;
        self.data.get(start..start + self.pitch)
    }
}

/// Writable view of a locked plane.
#[derive(Debug)]
pub struct PlaneViewMut<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
}

impl PlaneViewMut<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    pub fn as_view(&self) -> PlaneView<'_> {
        PlaneView {
            data: &*self.data,
            width: self.width,
            height: self.height,
            pitch: self.pitch,
            format: self.format,
        }
    }

    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.pitch;
        self.data.get_mut(start..start + self.pitch)
    }

    /// Copy rows from a source plane with its own stride, clipped to this
    /// plane. Returns the number of rows written.
    pub fn copy_from(&mut self, src: &[u8], src_pitch: usize) -> usize {
        if self.pitch == 0 || src_pitch == 0 {
            return 0;
        }
        let row_bytes = self.pitch.min(src_pitch);
        let mut rows = 0;
        for (dst, src) in self
            .data
            .chunks_exact_mut(self.pitch)
            .zip(src.chunks(src_pitch))
        {
            let n = row_bytes.min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
            rows += 1;
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_allocates_zeroed_bytes_for_format() {
        let mut b = MovieBuffer::new();
        b.init(4, 3, PixelFormat::LA8);
        assert_eq!(b.pitch(), 8);
        assert_eq!(b.view().data().len(), 24);
        assert!(b.view().data().iter().all(|&v| v == 0));
    }

    #[test]
    fn fill_zero_resets_written_bytes() {
        let mut b = MovieBuffer::new();
        b.init(2, 2, PixelFormat::L8);
        b.lock().data_mut().fill(0xAB);
        b.fill_zero();
        assert!(b.view().data().iter().all(|&v| v == 0));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut b = MovieBuffer::new();
        b.init(8, 8, PixelFormat::L8);
        b.cleanup();
        assert!(b.is_empty());
        b.cleanup();
        assert!(b.is_empty());
        assert_eq!(b.width(), 0);
        assert_eq!(b.height(), 0);
    }

    #[test]
    fn reinit_resizes() {
        let mut b = MovieBuffer::new();
        b.init(2, 2, PixelFormat::L8);
        b.init(4, 2, PixelFormat::LA8);
        assert_eq!(b.view().data().len(), 16);
        assert_eq!(b.format(), PixelFormat::LA8);
    }

    #[test]
    fn copy_from_clips_wider_source_rows() {
        let mut b = MovieBuffer::new();
        b.init(2, 2, PixelFormat::L8);
        let src = [1, 2, 3, 4, 5, 6];
        let rows = b.lock().copy_from(&src, 3);
        assert_eq!(rows, 2);
        assert_eq!(b.view().data(), &[1, 2, 4, 5]);
    }

    #[test]
    fn copy_from_stops_at_short_source() {
        let mut b = MovieBuffer::new();
        b.init(4, 4, PixelFormat::L8);
        let rows = b.lock().copy_from(&[9, 9, 9, 9, 7, 7], 4);
        assert_eq!(rows, 2);
        let view = b.view();
        assert_eq!(view.row(0), Some(&[9, 9, 9, 9][..]));
        assert_eq!(view.row(1), Some(&[7, 7, 0, 0][..]));
        assert_eq!(view.row(2), Some(&[0, 0, 0, 0][..]));
    }

    #[test]
    fn copy_into_empty_buffer_is_noop() {
        let mut b = MovieBuffer::new();
        assert_eq!(b.lock().copy_from(&[1, 2, 3], 3), 0);
    }

    #[test]
    fn row_out_of_range_is_none() {
        let mut b = MovieBuffer::new();
        b.init(2, 2, PixelFormat::LA8);
        assert!(b.lock().row_mut(2).is_none());
        assert!(b.view().row(5).is_none());
        assert_eq!(b.lock().row_mut(1).map(|r| r.len()), Some(4));
    }

    #[test]
    fn bytes_per_pixel() {
        assert_eq!(PixelFormat::L8.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::LA8.bytes_per_pixel(), 2);
    }
}
