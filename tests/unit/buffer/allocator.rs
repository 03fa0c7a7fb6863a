use super::*;

#[test]
fn allocation_and_release_are_accounted() {
    let alloc = HeapBitmapAllocator::default();
    let mut a = alloc.create_buffer(4, 4, PixelFormat::Rgba8Premul).unwrap();
    let b = alloc.create_buffer(2, 2, PixelFormat::Alpha8).unwrap();

    let st = alloc.stats();
    assert_eq!(st.live_buffers, 2);
    assert_eq!(st.live_bytes, 64 + 4);
    assert_eq!(st.allocated_total, 2);

    let a2 = a.clone();
    a.close();
    assert_eq!(alloc.stats().live_buffers, 2);
    drop(a2);
    drop(b);

    let st = alloc.stats();
    assert_eq!(st.live_buffers, 0);
    assert_eq!(st.live_bytes, 0);
    assert_eq!(st.released_total, 2);
}

#[test]
fn unset_dimensions_fail_allocation() {
    let alloc = HeapBitmapAllocator::default();
    let err = alloc
        .create_buffer(0, 8, PixelFormat::Rgba8Premul)
        .unwrap_err();
    assert!(matches!(err, ReelError::Allocation(_)));
    assert_eq!(alloc.stats().allocated_total, 0);
}

#[test]
fn budget_refuses_and_recovers() {
    let alloc = HeapBitmapAllocator::new(HeapAllocatorOpts {
        max_live_bytes: Some(64),
    });
    let a = alloc.create_buffer(4, 4, PixelFormat::Rgba8Premul).unwrap();
    assert!(alloc.create_buffer(1, 1, PixelFormat::Alpha8).is_err());
    assert_eq!(alloc.stats().refused_total, 1);
    assert_eq!(alloc.stats().live_bytes, 64);

    drop(a);
    assert!(alloc.create_buffer(4, 4, PixelFormat::Rgba8Premul).is_ok());
}

#[test]
fn buffers_start_transparent() {
    let alloc = HeapBitmapAllocator::default();
    let b = alloc.create_buffer(3, 3, PixelFormat::Rgba8).unwrap();
    assert!(b.get().unwrap().pixels().iter().all(|&v| v == 0));
}

#[test]
fn unaddressable_size_fails_without_leaking_budget() {
    let alloc = HeapBitmapAllocator::default();
    let err = alloc
        .create_buffer(u32::MAX, u32::MAX, PixelFormat::Alpha8)
        .unwrap_err();
    assert!(matches!(err, ReelError::Allocation(_)));
    let st = alloc.stats();
    assert_eq!((st.live_buffers, st.live_bytes, st.allocated_total), (0, 0, 0));
}
