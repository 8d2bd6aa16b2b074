use crate::{Image, ImageError};

/// Convert an RGB image to BGR by swapping the red and blue channels.
///
/// The conversion is symmetric, so the same function converts BGR back to RGB.
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output BGR image.
///
/// Precondition: the input and output images must have the same size.
pub fn bgr_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Copy,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(src.size(), dst.size()));
    }

    dst.pixels_mut()
        .zip(src.pixels())
        .for_each(|(dst_pixel, src_pixel)| {
            dst_pixel
                .iter_mut()
                .zip(src_pixel.iter().rev())
                .for_each(|(d, s)| {
                    *d = *s;
                });
        });

    Ok(())
}
