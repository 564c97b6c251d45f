//! Raw camera buffer → packed RGB conversion.
//!
//! Cameras hand out whatever their negotiated mode produces; the rest of the
//! pipeline only ever sees 3-channel RGB.

use crate::capture::domain::frame_source::CaptureError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Mono8,
    Yuyv,
    Mjpeg,
}

impl PixelFormat {
    /// Maps a V4L2 / GenICam pixel format name onto a supported format.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RGB3" | "RGB8" | "RGB8Packed" => Some(PixelFormat::Rgb8),
            "BGR3" | "BGR8" | "BGR8Packed" => Some(PixelFormat::Bgr8),
            "GREY" | "Mono8" => Some(PixelFormat::Mono8),
            "YUYV" | "YUV422_8" => Some(PixelFormat::Yuyv),
            "MJPG" | "JPEG" => Some(PixelFormat::Mjpeg),
            _ => None,
        }
    }
}

/// Converts a raw buffer to tightly packed RGB.
///
/// For MJPEG the decoded image dimensions must match `width` × `height`.
pub fn to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>, CaptureError> {
    let pixels = (width as usize) * (height as usize);
    match format {
        PixelFormat::Rgb8 => {
            ensure_len(data, pixels * 3, format)?;
            Ok(data[..pixels * 3].to_vec())
        }
        PixelFormat::Bgr8 => {
            ensure_len(data, pixels * 3, format)?;
            let mut rgb = Vec::with_capacity(pixels * 3);
            for px in data[..pixels * 3].chunks_exact(3) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
            Ok(rgb)
        }
        PixelFormat::Mono8 => {
            ensure_len(data, pixels, format)?;
            let mut rgb = Vec::with_capacity(pixels * 3);
            for &v in &data[..pixels] {
                rgb.extend_from_slice(&[v, v, v]);
            }
            Ok(rgb)
        }
        PixelFormat::Yuyv => yuyv_to_rgb(data, width, height),
        PixelFormat::Mjpeg => decode_jpeg(data, width, height),
    }
}

/// Flips packed RGB rows left-to-right in place.
pub fn mirror_horizontal(data: &mut [u8], width: u32, height: u32) {
    let w = width as usize;
    let row_len = w * 3;
    for row in data.chunks_exact_mut(row_len).take(height as usize) {
        for x in 0..w / 2 {
            let (a, b) = (x * 3, (w - 1 - x) * 3);
            for c in 0..3 {
                row.swap(a + c, b + c);
            }
        }
    }
}

fn ensure_len(data: &[u8], expected: usize, format: PixelFormat) -> Result<(), CaptureError> {
    if data.len() < expected {
        return Err(CaptureError::Unavailable(format!(
            "short {format:?} buffer: expected {expected} bytes, got {}",
            data.len()
        )));
    }
    Ok(())
}

/// YUYV packs `[Y0, U, Y1, V]` per pixel pair; BT.601 coefficients.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let pixels = (width as usize) * (height as usize);
    let expected = pixels * 2;
    ensure_len(data, expected, PixelFormat::Yuyv)?;

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in data[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            rgb.extend_from_slice(&[r, g, b]);
        }
    }
    Ok(rgb)
}

fn decode_jpeg(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Unavailable(format!("MJPEG decode failed: {e}")))?
        .to_rgb8();
    if decoded.width() != width || decoded.height() != height {
        return Err(CaptureError::Unavailable(format!(
            "MJPEG frame is {}x{}, negotiated mode is {width}x{height}",
            decoded.width(),
            decoded.height()
        )));
    }
    Ok(decoded.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("RGB3", Some(PixelFormat::Rgb8))]
    #[case("BGR8", Some(PixelFormat::Bgr8))]
    #[case("Mono8", Some(PixelFormat::Mono8))]
    #[case("YUYV", Some(PixelFormat::Yuyv))]
    #[case("MJPG", Some(PixelFormat::Mjpeg))]
    #[case("BayerRG12", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<PixelFormat>) {
        assert_eq!(PixelFormat::from_name(name), expected);
    }

    #[test]
    fn test_bgr_is_swapped() {
        let rgb = to_rgb(&[1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Bgr8).unwrap();
        assert_eq!(rgb, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_mono_is_replicated() {
        let rgb = to_rgb(&[7, 9], 2, 1, PixelFormat::Mono8).unwrap();
        assert_eq!(rgb, vec![7, 7, 7, 9, 9, 9]);
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        // U = V = 128 → R = G = B = Y
        let rgb = to_rgb(&[100, 128, 200, 128], 2, 1, PixelFormat::Yuyv).unwrap();
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_short_buffer_is_recoverable() {
        let err = to_rgb(&[0; 5], 2, 1, PixelFormat::Rgb8).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_mjpeg_roundtrip_through_encoder() {
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 40, 40]));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 95)
            .encode_image(&img)
            .unwrap();

        let rgb = to_rgb(&jpeg, 8, 4, PixelFormat::Mjpeg).unwrap();
        assert_eq!(rgb.len(), 8 * 4 * 3);
        assert!(rgb[0] > 150 && rgb[1] < 90);
    }

    #[test]
    fn test_mjpeg_size_mismatch_is_recoverable() {
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([0, 0, 0]));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut jpeg)
            .encode_image(&img)
            .unwrap();
        assert!(to_rgb(&jpeg, 16, 16, PixelFormat::Mjpeg)
            .unwrap_err()
            .is_recoverable());
    }

    #[test]
    fn test_garbage_mjpeg_is_recoverable() {
        assert!(to_rgb(&[0, 1, 2, 3], 2, 2, PixelFormat::Mjpeg)
            .unwrap_err()
            .is_recoverable());
    }

    #[test]
    fn test_mirror_horizontal_reverses_rows() {
        // 3x2: row0 = A B C, row1 = D E F
        let mut data = vec![
            1, 1, 1, 2, 2, 2, 3, 3, 3, //
            4, 4, 4, 5, 5, 5, 6, 6, 6,
        ];
        mirror_horizontal(&mut data, 3, 2);
        assert_eq!(
            data,
            vec![
                3, 3, 3, 2, 2, 2, 1, 1, 1, //
                6, 6, 6, 5, 5, 5, 4, 4, 4,
            ]
        );
    }
}
