use super::*;

#[test]
fn new_rejects_empty_dimensions() {
    assert!(Bitmap::new(0, 4, PixelFormat::Rgba8Premul).is_err());
    assert!(Bitmap::new(4, 0, PixelFormat::Alpha8).is_err());
}

#[test]
fn oversized_bitmap_is_an_allocation_error() {
    let err = Bitmap::new(u32::MAX, u32::MAX, PixelFormat::Alpha8).unwrap_err();
    assert!(matches!(err, ReelError::Allocation(_)));
    let err = Bitmap::new(u32::MAX, u32::MAX, PixelFormat::Rgba8Premul).unwrap_err();
    assert!(matches!(err, ReelError::Allocation(_)));
}

#[test]
fn size_follows_format() {
    let b = Bitmap::new(3, 2, PixelFormat::Rgba8Premul).unwrap();
    assert_eq!(b.size_in_bytes(), 24);
    assert!(b.has_size(3, 2));
    let a = Bitmap::new(3, 2, PixelFormat::Alpha8).unwrap();
    assert_eq!(a.size_in_bytes(), 6);
}

#[test]
fn from_pixels_checks_length() {
    assert!(Bitmap::from_pixels(2, 2, PixelFormat::Rgba8, vec![0; 15]).is_err());
    let b = Bitmap::from_pixels(2, 2, PixelFormat::Rgba8, vec![7; 16]).unwrap();
    assert_eq!(b.pixel_rgba(1, 1), Some([7, 7, 7, 7]));
    assert_eq!(b.pixel_rgba(2, 0), None);
}

#[test]
fn fill_and_erase() {
    let mut b = Bitmap::new(2, 2, PixelFormat::Rgba8Premul).unwrap();
    b.fill_rgba([10, 20, 30, 255]);
    assert_eq!(b.pixel_rgba(0, 1), Some([10, 20, 30, 255]));
    b.erase();
    assert!(b.pixels().iter().all(|&v| v == 0));

    let mut a = Bitmap::new(2, 1, PixelFormat::Alpha8).unwrap();
    a.fill_rgba([1, 2, 3, 99]);
    assert_eq!(a.pixel_rgba(1, 0), Some([0, 0, 0, 99]));
}

#[test]
fn rgba_image_unpremultiplies() {
    let b = Bitmap::from_pixels(1, 1, PixelFormat::Rgba8Premul, vec![64, 0, 128, 128]).unwrap();
    let img = b.to_rgba_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [128, 0, 255, 128]);

    let t = Bitmap::from_pixels(1, 1, PixelFormat::Rgba8Premul, vec![5, 5, 5, 0]).unwrap();
    assert_eq!(t.to_rgba_image().unwrap().get_pixel(0, 0).0, [0, 0, 0, 0]);
}
