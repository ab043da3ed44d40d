//! Packing raw 4:2:0 frames into the player's plane buffers.

use crate::buffer::{PixelFormat, PlaneViewMut};
use crate::geometry::chroma_size;

/// Borrowed planes of one `yuv420p`/`yuva420p` frame as ffmpeg emits it:
/// Y, U, V, then A when present.
#[derive(Debug, Clone, Copy)]
pub struct Yuv420Frame<'a> {
    pub width: u32,
    pub height: u32,
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub a: Option<&'a [u8]>,
}

impl<'a> Yuv420Frame<'a> {
    pub fn frame_size(width: u32, height: u32, has_alpha: bool) -> usize {
        let luma = width as usize * height as usize;
        let c = chroma_size(glam::UVec2::new(width, height));
        let chroma = c.x as usize * c.y as usize;
        luma + 2 * chroma + if has_alpha { luma } else { 0 }
    }

    /// Split a contiguous frame. `None` if `data` is too short.
    pub fn split(data: &'a [u8], width: u32, height: u32, has_alpha: bool) -> Option<Self> {
        if data.len() < Self::frame_size(width, height, has_alpha) {
            return None;
        }
        let luma = width as usize * height as usize;
        let c = chroma_size(glam::UVec2::new(width, height));
        let chroma = c.x as usize * c.y as usize;

        let (y, rest) = data.split_at(luma);
        let (u, rest) = rest.split_at(chroma);
        let (v, rest) = rest.split_at(chroma);
        let a = has_alpha.then(|| &rest[..luma]);
        Some(Self {
            width,
            height,
            y,
            u,
            v,
            a,
        })
    }
}

/// Write `frame` into the top-left of the YA and UV planes, clipped to both.
///
/// YA: `L8` takes luma only, `LA8` interleaves luma with alpha (opaque when
/// the frame has none). UV: `LA8` interleaves U and V, `L8` keeps U only.
pub fn pack_yuv420(frame: &Yuv420Frame<'_>, ya: &mut PlaneViewMut<'_>, uv: &mut PlaneViewMut<'_>) {
    let ya_format = ya.format();
    let uv_format = uv.format();
    let w = frame.width as usize;
    let cols = frame.width.min(ya.width()) as usize;
    for row in 0..frame.height.min(ya.height()) {
        let src = row as usize * w;
        let Some(dst) = ya.row_mut(row) else { break };
        let luma = &frame.y[src..src + cols];
        match ya_format {
            PixelFormat::L8 => dst[..cols].copy_from_slice(luma),
            PixelFormat::LA8 => {
                for (x, px) in dst.chunks_exact_mut(2).take(cols).enumerate() {
                    px[0] = luma[x];
                    px[1] = frame.a.map_or(u8::MAX, |a| a[src + x]);
                }
            }
        }
    }

    let c = chroma_size(glam::UVec2::new(frame.width, frame.height));
    let cw = c.x as usize;
    let ccols = c.x.min(uv.width()) as usize;
    for row in 0..c.y.min(uv.height()) {
        let src = row as usize * cw;
        let Some(dst) = uv.row_mut(row) else { break };
        let u = &frame.u[src..src + ccols];
        match uv_format {
            PixelFormat::L8 => dst[..ccols].copy_from_slice(u),
            PixelFormat::LA8 => {
                let v = &frame.v[src..src + ccols];
                for (x, px) in dst.chunks_exact_mut(2).take(ccols).enumerate() {
                    px[0] = u[x];
                    px[1] = v[x];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MovieBuffer;

    fn frame_bytes(w: u32, h: u32, alpha: bool) -> Vec<u8> {
        let luma = (w * h) as usize;
        let c = chroma_size(glam::UVec2::new(w, h));
        let chroma = (c.x * c.y) as usize;
        let mut data = Vec::new();
        data.extend((0..luma).map(|i| i as u8));
        data.extend(std::iter::repeat_n(100, chroma));
        data.extend(std::iter::repeat_n(200, chroma));
        if alpha {
            data.extend(std::iter::repeat_n(50, luma));
        }
        data
    }

    #[test]
    fn frame_size_rounds_chroma_up() {
        assert_eq!(Yuv420Frame::frame_size(4, 2, false), 8 + 2 * 2);
        assert_eq!(Yuv420Frame::frame_size(3, 3, false), 9 + 2 * 4);
        assert_eq!(Yuv420Frame::frame_size(4, 2, true), 8 + 2 * 2 + 8);
    }

    #[test]
    fn split_rejects_short_frames() {
        let data = frame_bytes(4, 2, false);
        assert!(Yuv420Frame::split(&data[..data.len() - 1], 4, 2, false).is_none());
        assert!(Yuv420Frame::split(&data, 4, 2, true).is_none());
    }

    #[test]
    fn pack_opaque_into_l8_and_interleaved_uv() {
        let data = frame_bytes(4, 2, false);
        let frame = Yuv420Frame::split(&data, 4, 2, false).unwrap();

        let mut ya = MovieBuffer::new();
        ya.init(4, 2, PixelFormat::L8);
        let mut uv = MovieBuffer::new();
        uv.init(2, 1, PixelFormat::LA8);
        pack_yuv420(&frame, &mut ya.lock(), &mut uv.lock());

        assert_eq!(ya.view().data(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(uv.view().data(), &[100, 200, 100, 200]);
    }

    #[test]
    fn pack_alpha_interleaves_luma_and_alpha() {
        let data = frame_bytes(2, 2, true);
        let frame = Yuv420Frame::split(&data, 2, 2, true).unwrap();

        let mut ya = MovieBuffer::new();
        ya.init(2, 2, PixelFormat::LA8);
        let mut uv = MovieBuffer::new();
        uv.init(1, 1, PixelFormat::LA8);
        pack_yuv420(&frame, &mut ya.lock(), &mut uv.lock());

        assert_eq!(ya.view().data(), &[0, 50, 1, 50, 2, 50, 3, 50]);
    }

    #[test]
    fn missing_alpha_packs_opaque() {
        let data = frame_bytes(2, 1, false);
        let frame = Yuv420Frame::split(&data, 2, 1, false).unwrap();
        let mut ya = MovieBuffer::new();
        ya.init(2, 1, PixelFormat::LA8);
        let mut uv = MovieBuffer::new();
        uv.init(1, 1, PixelFormat::L8);
        pack_yuv420(&frame, &mut ya.lock(), &mut uv.lock());
        assert_eq!(ya.view().data(), &[0, 255, 1, 255]);
        assert_eq!(uv.view().data(), &[100]);
    }

    #[test]
    fn padded_planes_keep_zero_border() {
        let data = frame_bytes(3, 3, false);
        let frame = Yuv420Frame::split(&data, 3, 3, false).unwrap();
        let mut ya = MovieBuffer::new();
        ya.init(4, 4, PixelFormat::L8);
        let mut uv = MovieBuffer::new();
        uv.init(2, 2, PixelFormat::LA8);
        pack_yuv420(&frame, &mut ya.lock(), &mut uv.lock());

        let view = ya.view();
        assert_eq!(view.row(0), Some(&[0, 1, 2, 0][..]));
        assert_eq!(view.row(2), Some(&[6, 7, 8, 0][..]));
        assert_eq!(view.row(3), Some(&[0, 0, 0, 0][..]));
        assert_eq!(uv.view().row(1), Some(&[100, 200, 100, 200][..]));
    }
}
